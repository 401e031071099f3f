// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the scan-button bridge.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one document job (the pages gathered between two saves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Fresh random job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A button the operator can press on the device's scan-to menu.
///
/// The discriminant is the slot number (`APPNUM`) advertised to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Capture one page, then save everything buffered as a document.
    LastPage = 1,
    /// Capture one page and keep it buffered.
    MultiPage = 2,
    /// Save the buffered pages without capturing a new one.
    FinishMultiPage = 3,
    /// Throw the buffered pages away.
    AbortMultiPage = 4,
}

impl Command {
    /// All commands in slot order.
    pub const ALL: [Command; 4] = [
        Command::LastPage,
        Command::MultiPage,
        Command::FinishMultiPage,
        Command::AbortMultiPage,
    ];

    /// Map a device slot number to its command.
    pub fn from_slot(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(Self::LastPage),
            2 => Some(Self::MultiPage),
            3 => Some(Self::FinishMultiPage),
            4 => Some(Self::AbortMultiPage),
            _ => None,
        }
    }

    /// Slot number (`APPNUM`) of this command, always in `1..=4`.
    pub fn slot(self) -> u8 {
        self as u8
    }

    /// Short name shown on the device display.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::LastPage => "Last page",
            Self::MultiPage => "Multipage",
            Self::FinishMultiPage => "Finish MP",
            Self::AbortMultiPage => "Abort MP",
        }
    }

    /// Menu label sent to the device.
    ///
    /// The device sorts its menu alphabetically, so the slot number goes first.
    pub fn menu_label(self) -> String {
        format!("{} {}", self.slot(), self.display_name())
    }

    /// Whether the command needs a real page capture (as opposed to the dummy
    /// capture that only clears the device's busy state).
    pub fn captures_page(self) -> bool {
        matches!(self, Self::LastPage | Self::MultiPage)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Scan area in millimetres, passed to the capture tool as `-x`/`-y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanArea {
    pub width_mm: u32,
    pub height_mm: u32,
}

impl ScanArea {
    /// A full A4 page.
    pub const FULL_PAGE: ScanArea = ScanArea {
        width_mm: 210,
        height_mm: 297,
    };

    /// Smallest possible area, used for the dummy capture.
    pub const DUMMY: ScanArea = ScanArea {
        width_mm: 1,
        height_mm: 1,
    };
}

/// Image format requested from the capture tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    Jpeg,
    Png,
    Tiff,
}

impl CaptureFormat {
    /// Value for the capture tool's `--format` flag.
    pub fn tool_keyword(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Tiff => "tiff",
        }
    }
}

/// Everything the capture tool needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub resolution_dpi: u32,
    pub area: ScanArea,
    pub format: CaptureFormat,
    /// Scanner selector (`--device`), if the default device is not wanted.
    pub device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_map_to_commands() {
        assert_eq!(Command::from_slot(1), Some(Command::LastPage));
        assert_eq!(Command::from_slot(2), Some(Command::MultiPage));
        assert_eq!(Command::from_slot(3), Some(Command::FinishMultiPage));
        assert_eq!(Command::from_slot(4), Some(Command::AbortMultiPage));
    }

    #[test]
    fn out_of_range_slots_are_rejected() {
        assert_eq!(Command::from_slot(0), None);
        assert_eq!(Command::from_slot(5), None);
        assert_eq!(Command::from_slot(u8::MAX), None);
    }

    #[test]
    fn slot_round_trips_for_every_command() {
        for command in Command::ALL {
            assert_eq!(Command::from_slot(command.slot()), Some(command));
        }
    }

    #[test]
    fn menu_labels_sort_in_slot_order() {
        let mut labels: Vec<String> = Command::ALL.iter().map(|c| c.menu_label()).collect();
        let in_slot_order = labels.clone();
        labels.sort();
        assert_eq!(labels, in_slot_order);
        assert_eq!(in_slot_order[0], "1 Last page");
        assert_eq!(in_slot_order[3], "4 Abort MP");
    }

    #[test]
    fn only_page_commands_capture_pages() {
        assert!(Command::LastPage.captures_page());
        assert!(Command::MultiPage.captures_page());
        assert!(!Command::FinishMultiPage.captures_page());
        assert!(!Command::AbortMultiPage.captures_page());
    }
}
