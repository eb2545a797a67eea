//! Save the clipboard whenever the configured hotkey is pressed.

use std::{sync::mpsc, thread};

use anyhow::{anyhow, bail, Context};
use app_config::{HotkeyModifier, LinksConfig};
use app_logger::{debug, info, warn};
use rdev::{EventType, Key};

use crate::store::LinkStore;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListenerEvent {
    Save,
    Stop,
    Failed(String),
}

fn modifier_keys(modifier: HotkeyModifier) -> [Key; 2] {
    match modifier {
        HotkeyModifier::Meta => [Key::MetaLeft, Key::MetaRight],
        HotkeyModifier::Ctrl => [Key::ControlLeft, Key::ControlRight],
        HotkeyModifier::Alt => [Key::Alt, Key::AltGr],
    }
}

fn key_for_char(c: char) -> Option<Key> {
    let key = match c.to_ascii_lowercase() {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        'z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        _ => return None,
    };

    Some(key)
}

/// Turns raw key events into hotkey presses.
#[derive(Debug)]
struct HotkeyState {
    modifiers: [Key; 2],
    key: Key,
    held: [bool; 2],
}

impl HotkeyState {
    fn new(settings: &LinksConfig) -> anyhow::Result<Self> {
        let key = key_for_char(settings.hotkey_key).ok_or_else(|| {
            anyhow!(
                "Unsupported hotkey key {:?}, use a letter or a digit",
                settings.hotkey_key
            )
        })?;

        Ok(Self {
            modifiers: modifier_keys(settings.hotkey_modifier),
            key,
            held: [false; 2],
        })
    }

    fn handle(&mut self, event: &EventType) -> Option<ListenerEvent> {
        match event {
            EventType::KeyPress(k) => {
                if let Some(i) = self.modifiers.iter().position(|m| m == k) {
                    self.held[i] = true;
                    return None;
                }

                if *k == self.key && self.held.iter().any(|h| *h) {
                    return Some(ListenerEvent::Save);
                }

                None
            }
            EventType::KeyRelease(Key::Escape) => Some(ListenerEvent::Stop),
            EventType::KeyRelease(k) => {
                if let Some(i) = self.modifiers.iter().position(|m| m == k) {
                    self.held[i] = false;
                }
                None
            }
            _ => None,
        }
    }
}

fn hotkey_label(settings: &LinksConfig) -> String {
    let modifier = match settings.hotkey_modifier {
        HotkeyModifier::Meta => "Cmd/Super",
        HotkeyModifier::Ctrl => "Ctrl",
        HotkeyModifier::Alt => "Alt",
    };

    format!("{modifier}+{}", settings.hotkey_key.to_ascii_uppercase())
}

fn read_clipboard() -> anyhow::Result<String> {
    let mut clipboard = arboard::Clipboard::new().context("Failed to open the clipboard")?;

    clipboard
        .get_text()
        .context("Failed to read text from the clipboard")
}

fn spawn_listener(mut state: HotkeyState, tx: mpsc::Sender<ListenerEvent>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("hotkey-listener".into())
        .spawn(move || {
            let err_tx = tx.clone();

            let res = rdev::listen(move |event| {
                if let Some(e) = state.handle(&event.event_type) {
                    debug!("Hotkey listener: {e:?}");
                    let _ = tx.send(e);
                }
            });

            if let Err(e) = res {
                let _ = err_tx.send(ListenerEvent::Failed(format!("{e:?}")));
            }
        })
        .context("Failed to start the hotkey listener")?;

    Ok(())
}

/// Block until Esc is pressed, saving the clipboard on every hotkey press.
pub fn listen(store: &mut LinkStore, settings: &LinksConfig) -> anyhow::Result<()> {
    let state = HotkeyState::new(settings)?;
    let label = hotkey_label(settings);

    let (tx, rx) = mpsc::channel();
    spawn_listener(state, tx)?;

    println!("🎯 YouTube link saver is running");
    println!("📋 Currently saved: {} link(s)", store.len());
    println!("💾 Saving to: {}", store.path().display());
    println!();
    println!("Copy a YouTube link and press {label} to save it.");
    println!("Press Esc to stop.");
    info!("Listening for {label}");

    for event in rx {
        match event {
            ListenerEvent::Save => {
                println!("\n🔥 Hotkey detected!");

                let text = match read_clipboard() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("{e:?}");
                        println!("❌ Could not read the clipboard");
                        continue;
                    }
                };

                println!("{}", store.save_link(&text)?);
            }
            ListenerEvent::Stop => {
                println!("\n⏹ Stopping listener... Goodbye!");
                return Ok(());
            }
            ListenerEvent::Failed(e) => bail!("Hotkey listener stopped: {e}"),
        }
    }

    bail!("Hotkey listener stopped unexpectedly")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(modifier: HotkeyModifier, key: char) -> HotkeyState {
        HotkeyState::new(&LinksConfig {
            hotkey_modifier: modifier,
            hotkey_key: key,
        })
        .unwrap()
    }

    #[test]
    fn key_alone_does_nothing() {
        let mut state = state(HotkeyModifier::Meta, 'b');

        assert_eq!(state.handle(&EventType::KeyPress(Key::KeyB)), None);
    }

    #[test]
    fn modifier_and_key_save() {
        let mut state = state(HotkeyModifier::Meta, 'b');

        assert_eq!(state.handle(&EventType::KeyPress(Key::MetaRight)), None);
        assert_eq!(
            state.handle(&EventType::KeyPress(Key::KeyB)),
            Some(ListenerEvent::Save)
        );
    }

    #[test]
    fn released_modifier_no_longer_counts() {
        let mut state = state(HotkeyModifier::Ctrl, 'S');

        state.handle(&EventType::KeyPress(Key::ControlLeft));
        state.handle(&EventType::KeyRelease(Key::ControlLeft));

        assert_eq!(state.handle(&EventType::KeyPress(Key::KeyS)), None);
    }

    #[test]
    fn escape_stops() {
        let mut state = state(HotkeyModifier::Alt, 'b');

        assert_eq!(
            state.handle(&EventType::KeyRelease(Key::Escape)),
            Some(ListenerEvent::Stop)
        );
    }

    #[test]
    fn unsupported_keys_are_rejected() {
        let settings = LinksConfig {
            hotkey_modifier: HotkeyModifier::Meta,
            hotkey_key: '#',
        };

        assert!(HotkeyState::new(&settings).is_err());
    }

    #[test]
    fn labels() {
        let settings = LinksConfig::default();

        assert_eq!(hotkey_label(&settings), "Cmd/Super+B");
    }
}
