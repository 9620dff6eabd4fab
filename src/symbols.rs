use bitflags::bitflags;
use std::fmt;

/// The kind of a usage event, as recorded in the `type` field of an event-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventType {
    None = 0,
    MoveToForeground = 1,
    MoveToBackground = 2,
    EndOfDay = 3,
    ContinuePreviousDay = 4,
    ConfigurationChange = 5,
    SystemInteraction = 6,
    UserInteraction = 7,
    ShortcutInvocation = 8,
    ChooserAction = 9,
    NotificationSeen = 10,
    StandbyBucketChanged = 11,
    NotificationInterruption = 12,
    SlicePinnedPriv = 13,
    SlicePinned = 14,
    ScreenInteractive = 15,
    ScreenNonInteractive = 16,
    KeyguardShown = 17,
    KeyguardHidden = 18,
}

impl EventType {
    pub const ALL: [EventType; 19] = [
        EventType::None,
        EventType::MoveToForeground,
        EventType::MoveToBackground,
        EventType::EndOfDay,
        EventType::ContinuePreviousDay,
        EventType::ConfigurationChange,
        EventType::SystemInteraction,
        EventType::UserInteraction,
        EventType::ShortcutInvocation,
        EventType::ChooserAction,
        EventType::NotificationSeen,
        EventType::StandbyBucketChanged,
        EventType::NotificationInterruption,
        EventType::SlicePinnedPriv,
        EventType::SlicePinned,
        EventType::ScreenInteractive,
        EventType::ScreenNonInteractive,
        EventType::KeyguardShown,
        EventType::KeyguardHidden,
    ];

    pub fn from_code(code: i32) -> Option<EventType> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| EventType::ALL.get(idx).copied())
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canonical name, as the Android framework spells it.
    pub fn name(self) -> &'static str {
        match self {
            EventType::None => "NONE",
            EventType::MoveToForeground => "MOVE_TO_FOREGROUND",
            EventType::MoveToBackground => "MOVE_TO_BACKGROUND",
            EventType::EndOfDay => "END_OF_DAY",
            EventType::ContinuePreviousDay => "CONTINUE_PREVIOUS_DAY",
            EventType::ConfigurationChange => "CONFIGURATION_CHANGE",
            EventType::SystemInteraction => "SYSTEM_INTERACTION",
            EventType::UserInteraction => "USER_INTERACTION",
            EventType::ShortcutInvocation => "SHORTCUT_INVOCATION",
            EventType::ChooserAction => "CHOOSER_ACTION",
            EventType::NotificationSeen => "NOTIFICATION_SEEN",
            EventType::StandbyBucketChanged => "STANDBY_BUCKET_CHANGED",
            EventType::NotificationInterruption => "NOTIFICATION_INTERRUPTION",
            EventType::SlicePinnedPriv => "SLICE_PINNED_PRIV",
            EventType::SlicePinned => "SLICE_PINNED",
            EventType::ScreenInteractive => "SCREEN_INTERACTIVE",
            EventType::ScreenNonInteractive => "SCREEN_NON_INTERACTIVE",
            EventType::KeyguardShown => "KEYGUARD_SHOWN",
            EventType::KeyguardHidden => "KEYGUARD_HIDDEN",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name for a raw event type code. Unknown codes render as their decimal value.
pub fn event_type_name(code: i32) -> String {
    match EventType::from_code(code) {
        Some(event_type) => event_type.name().to_owned(),
        None => code.to_string(),
    }
}

bitflags! {
    /// Bits of the `flags` field of an event-log entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: i32 {
        const FLAG_IS_PACKAGE_INSTANT_APP = 1;
    }
}

impl EventFlags {
    /// Names of every set bit. Bits without a name render as hex (`0x4`).
    pub fn names(self) -> Vec<String> {
        let mut names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_owned())
            .collect();

        let unknown = self.bits() & !EventFlags::all().bits();
        if unknown != 0 {
            names.push(format!("{unknown:#x}"));
        }

        names
    }
}

/// Flag names for a raw `flags` value. Never fails, unknown bits are kept.
pub fn event_flag_names(raw: i32) -> Vec<String> {
    EventFlags::from_bits_retain(raw).names()
}
