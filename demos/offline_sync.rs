//! Offline Sync Example
//!
//! A client that stops polling keeps editing locally: its first edit stays
//! outstanding and everything after it is composed into a buffer. When it
//! polls again, remote operations are transformed past the pending edits and
//! the buffer is sent as one operation.
//!
//! Run with: cargo run --example offline_sync

use ot_sdk::prelude::*;

fn main() -> Result<(), SdkError> {
    println!("=== Offline Sync Example ===\n");

    let server = MemoryServer::new();
    let mut mobile = EditorClient::new(
        MemoryEditor::new(),
        server.connect_as("mobile", "Mobile"),
    );
    let mut desktop = EditorClient::new(
        MemoryEditor::new(),
        server.connect_as("desktop", "Desktop"),
    );

    // === Phase 1: Initial sync (both online) ===
    println!("=== Phase 1: Both Online ===\n");

    desktop.apply_local(|e| e.insert(0, "Shopping List\n============\n"))?;
    desktop.sync()?;
    mobile.sync()?;
    println!("Desktop creates initial document:");
    println!("{}", mobile.editor().text());

    // === Phase 2: Mobile goes offline ===
    println!("=== Phase 2: Mobile Goes Offline ===\n");

    let top = mobile.editor().len();
    mobile.apply_local(|e| e.insert(top, "[ ] Milk\n"))?;
    mobile.apply_local(|e| e.insert(top, "[ ] Bread\n"))?;
    mobile.apply_local(|e| e.insert(top, "[ ] Eggs\n"))?;
    println!("Mobile adds items (offline):");
    println!("{}", mobile.editor().text());
    println!("Mobile state: {}", mobile.client().state().name());
    if let Some(buffer) = mobile.client().state().buffer() {
        println!("Buffered edits: {}", buffer);
    }

    // Meanwhile, Desktop also makes changes
    let end = desktop.editor().len();
    desktop.apply_local(|e| e.insert(end, "[ ] Coffee\n"))?;
    desktop.sync()?;
    let end = desktop.editor().len();
    desktop.apply_local(|e| e.insert(end, "[ ] Sugar\n"))?;
    desktop.sync()?;
    println!("\nDesktop adds items (online):");
    println!("{}", desktop.editor().text());

    // === Phase 3: Mobile comes back online ===
    println!("\n=== Phase 3: Mobile Reconnects ===\n");

    while !(mobile.client().is_synchronized() && desktop.client().is_synchronized()) {
        let handled = mobile.sync()? + desktop.sync()?;
        println!(
            "  round: {} events, mobile {}, desktop {}",
            handled,
            mobile.client().state().name(),
            desktop.client().state().name()
        );
    }
    desktop.sync()?;

    println!("\nMobile's document:");
    println!("{}", mobile.editor().text());
    println!("Desktop's document:");
    println!("{}", desktop.editor().text());
    println!("Identical: {}", mobile.editor().text() == desktop.editor().text());
    println!("Server revisions: {}", server.revision());

    // === Concurrent inserts at the same index ===
    println!("\n=== Concurrent Edit Example ===\n");

    mobile.apply_local(|e| e.insert(0, "[!] Urgent: "))?;
    desktop.apply_local(|e| e.insert(0, "[*] Note: "))?;
    println!("Mobile inserts '[!] Urgent: ' at position 0");
    println!("Desktop inserts '[*] Note: ' at position 0 (concurrent)");

    while !(mobile.client().is_synchronized() && desktop.client().is_synchronized()) {
        mobile.sync()?;
        desktop.sync()?;
    }
    mobile.sync()?;
    desktop.sync()?;

    println!("\nThe first edit to reach the server keeps its place;");
    println!("the other is transformed to sit next to it:");
    println!("{}", server.document().lines().next().unwrap_or_default());

    println!("\n=== Demo Complete ===");
    Ok(())
}
