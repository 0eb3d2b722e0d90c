//! Mute and push-to-talk input.
//!
//! Hosts translate their own key or button events into [`InputEvent`]s and push them into the
//! session through [`crate::SessionHandle::input`]. The subscription lives and dies with the
//! session.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PushToTalkPressed,
    PushToTalkReleased,
    ToggleMute,
    SetMuted(bool),
    TogglePushToTalk,
    SetPushToTalk(bool),
}

impl InputEvent {
    /// Map a DOM-style key code to an input event.
    ///
    /// Space is push-to-talk, `KeyM` toggles mute and `KeyP` toggles push-to-talk mode.
    /// Auto-repeated key downs are ignored.
    pub fn from_hotkey(code: &str, pressed: bool, repeat: bool) -> Option<Self> {
        match (code, pressed) {
            (_, true) if repeat => None,
            ("Space", true) => Some(Self::PushToTalkPressed),
            ("Space", false) => Some(Self::PushToTalkReleased),
            ("KeyM", true) => Some(Self::ToggleMute),
            ("KeyP", true) => Some(Self::TogglePushToTalk),
            _ => None,
        }
    }
}

/// Decides whether the outgoing mic track is live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MicGate {
    muted: bool,
    push_to_talk: bool,
    talking: bool,
}

impl MicGate {
    pub fn enabled(&self) -> bool {
        !self.muted && (!self.push_to_talk || self.talking)
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn push_to_talk(&self) -> bool {
        self.push_to_talk
    }

    /// Apply an input event and return the resulting mic enablement.
    pub fn apply(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::PushToTalkPressed => self.talking = true,
            InputEvent::PushToTalkReleased => self.talking = false,
            InputEvent::ToggleMute => self.muted = !self.muted,
            InputEvent::SetMuted(muted) => self.muted = muted,
            InputEvent::TogglePushToTalk => self.set_push_to_talk(!self.push_to_talk),
            InputEvent::SetPushToTalk(on) => self.set_push_to_talk(on),
        }
        let enabled = self.enabled();
        debug!(?event, enabled, "mic gate updated");
        enabled
    }

    fn set_push_to_talk(&mut self, on: bool) {
        self.push_to_talk = on;
        self.talking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkeys() {
        assert_eq!(
            InputEvent::from_hotkey("Space", true, false),
            Some(InputEvent::PushToTalkPressed)
        );
        assert_eq!(InputEvent::from_hotkey("Space", true, true), None);
        assert_eq!(
            InputEvent::from_hotkey("Space", false, true),
            Some(InputEvent::PushToTalkReleased)
        );
        assert_eq!(
            InputEvent::from_hotkey("KeyM", true, false),
            Some(InputEvent::ToggleMute)
        );
        assert_eq!(InputEvent::from_hotkey("KeyM", false, false), None);
        assert_eq!(InputEvent::from_hotkey("KeyX", true, false), None);
    }

    #[test]
    fn open_by_default() {
        assert!(MicGate::default().enabled());
    }

    #[test]
    fn push_to_talk_gates_the_mic() {
        let mut gate = MicGate::default();
        assert!(!gate.apply(InputEvent::TogglePushToTalk));
        assert!(gate.apply(InputEvent::PushToTalkPressed));
        assert!(!gate.apply(InputEvent::PushToTalkReleased));

        // Leaving push-to-talk mode re-opens the mic.
        assert!(gate.apply(InputEvent::SetPushToTalk(false)));
    }

    #[test]
    fn mute_overrides_push_to_talk() {
        let mut gate = MicGate::default();
        gate.apply(InputEvent::TogglePushToTalk);
        gate.apply(InputEvent::PushToTalkPressed);
        assert!(!gate.apply(InputEvent::ToggleMute));
        assert!(gate.apply(InputEvent::SetMuted(false)));
    }

    #[test]
    fn switching_mode_releases_the_key() {
        let mut gate = MicGate::default();
        gate.apply(InputEvent::SetPushToTalk(true));
        assert!(gate.apply(InputEvent::PushToTalkPressed));
        // Re-entering push-to-talk mode forgets the held key.
        assert!(!gate.apply(InputEvent::SetPushToTalk(true)));
        assert!(gate.push_to_talk());
    }
}
