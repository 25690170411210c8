//! Presence of remote users: names, colours and cursors.

use crate::adapter::EditorAdapter;
use ot_core::Cursor;

/// What we know about another user editing the same document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteClient {
    client_id: String,
    user_name: Option<String>,
    color: String,
    cursor: Option<Cursor>,
}

impl RemoteClient {
    /// A remote user with a colour derived from their id.
    pub fn new(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        let color = color_from_user_id(&client_id);
        Self {
            client_id,
            user_name: None,
            color,
            cursor: None,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_user_name(&mut self, user_name: impl Into<String>) {
        self.user_name = Some(user_name.into());
    }

    /// Replace the user's cursor mark in `editor`.
    pub fn update_cursor<E: EditorAdapter>(&mut self, editor: &mut E, cursor: Cursor) {
        self.remove_cursor(editor);
        self.cursor = Some(cursor);
        editor.set_other_cursor(&self.client_id, cursor, &self.color, self.user_name.as_deref());
    }

    /// Remove the user's cursor mark from `editor`, if shown.
    pub fn remove_cursor<E: EditorAdapter>(&mut self, editor: &mut E) {
        if self.cursor.take().is_some() {
            editor.remove_other_cursor(&self.client_id);
        }
    }
}

/// A stable pastel colour for a user id, as `#rrggbb`.
///
/// The hue comes from a rolling hash over the id's UTF-16 code units;
/// saturation is 1 and lightness 0.75.
pub fn color_from_user_id(user_id: &str) -> String {
    let hash = user_id
        .encode_utf16()
        .fold(1u32, |acc, unit| (17 * (acc + u32::from(unit))) % 360);
    hsl_to_hex(f64::from(hash) / 360.0, 1.0, 0.75)
}

fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    if saturation == 0.0 {
        return rgb_to_hex(lightness, lightness, lightness);
    }

    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - saturation * lightness
    };
    let p = 2.0 * lightness - q;

    rgb_to_hex(
        hue_to_rgb(hue + 1.0 / 3.0, p, q),
        hue_to_rgb(hue, p, q),
        hue_to_rgb(hue - 1.0 / 3.0, p, q),
    )
}

fn hue_to_rgb(mut t: f64, p: f64, q: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }

    if 6.0 * t < 1.0 {
        p + (q - p) * 6.0 * t
    } else if 2.0 * t < 1.0 {
        q
    } else if 3.0 * t < 2.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

fn rgb_to_hex(red: f64, green: f64, blue: f64) -> String {
    let channel = |c: f64| (255.0 * c).round().clamp(0.0, 255.0) as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(red),
        channel(green),
        channel(blue)
    )
}
