//! Collaborative Text Editing Example
//!
//! Three users edit one shared document through an in-memory operation log.
//! Concurrent edits are transformed against each other and every editor ends
//! up with the same text and formatting.
//!
//! Run with: cargo run --example collaborative_text

use ot_sdk::prelude::*;
use ot_sdk::attrs;

type Session = EditorClient<MemoryEditor, MemoryDatabase>;

fn settle(sessions: &mut [Session]) -> Result<(), SdkError> {
    loop {
        let mut handled = 0;
        for session in sessions.iter_mut() {
            handled += session.sync()?;
        }
        if handled == 0 && sessions.iter().all(|s| s.client().is_synchronized()) {
            return Ok(());
        }
    }
}

fn main() -> Result<(), SdkError> {
    println!("=== Collaborative Text Editing Example ===\n");

    let server = MemoryServer::new();
    let names = ["Alice", "Bob", "Charlie"];

    let mut sessions: Vec<Session> = names
        .iter()
        .map(|name| {
            let database = server.connect_as(name.to_lowercase(), *name);
            EditorClient::new(MemoryEditor::new(), database)
        })
        .collect();

    println!("Created {} sessions:", sessions.len());
    for (name, session) in names.iter().zip(&sessions) {
        println!("  - {} (client: {})", name, session.client_id());
    }
    settle(&mut sessions)?;

    // Alice adds the title
    println!("\nAlice adds the title...");
    sessions[0].apply_local(|e| e.insert(0, "# Team Meeting Notes\n\n"))?;
    settle(&mut sessions)?;
    println!("  Everyone sees: {:?}", sessions[2].editor().text());

    // Bob and Charlie type at the end of the document at the same time
    println!("\nBob and Charlie append concurrently...");
    let end = sessions[1].editor().len();
    sessions[1].apply_local(|e| e.insert(end, "## Agenda\n- Review Q4 goals\n"))?;
    let end = sessions[2].editor().len();
    sessions[2].apply_local(|e| e.insert(end, "- Discuss team expansion\n"))?;

    println!("  Bob's view:     {:?}", sessions[1].editor().text());
    println!("  Charlie's view: {:?}", sessions[2].editor().text());
    println!("  Bob state:      {}", sessions[1].client().state().name());
    println!("  Charlie state:  {}", sessions[2].client().state().name());

    settle(&mut sessions)?;

    // Alice makes the title bold while Bob deletes the heading marker
    println!("\nAlice bolds the title while Bob removes the '# '...");
    sessions[0].apply_local(|e| e.format(2, 18, attrs([("bold", true)])))?;
    sessions[1].apply_local(|e| e.delete(0, 2))?;
    settle(&mut sessions)?;

    println!("\n=== Final Document Views ===\n");
    for (name, session) in names.iter().zip(&sessions) {
        let bold = session
            .editor()
            .attributes()
            .iter()
            .filter(|a| a.contains_key("bold"))
            .count();
        println!("--- {}'s view ({} bold characters) ---", name, bold);
        println!("{}", session.editor().text());
    }
    println!("Server document matches: {}", sessions[0].editor().text() == server.document());

    // Undo travels through the same pipeline as any other edit
    println!("\n=== Undo ===\n");
    sessions[1].undo()?;
    settle(&mut sessions)?;
    println!("Bob undid his delete; Alice now sees:");
    println!("{}", sessions[0].editor().text());

    // Presence
    println!("\n=== Presence ===\n");
    sessions[0].on_focus()?;
    sessions[1].on_focus()?;
    settle(&mut sessions)?;

    for remote in sessions[2].remote_clients() {
        println!(
            "Charlie sees {} at {:?} in {}",
            remote.user_name().unwrap_or(remote.client_id()),
            remote.cursor(),
            remote.color()
        );
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
