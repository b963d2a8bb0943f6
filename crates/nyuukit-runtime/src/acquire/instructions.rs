//! Per-platform installation guidance for helper tools.

use nyuukit_core::ToolKind;

/// Human-readable steps to install `tool` on the current platform.
pub fn install_instructions(tool: ToolKind) -> String {
    let os = std::env::consts::OS;
    match (tool, os) {
        (ToolKind::Poster, _) => {
            "Download it with:\n  nyuukit setup\n\nor set `nyuu_path` in the config to an existing Nyuu executable.".to_string()
        }
        (ToolKind::Archiver, "windows") => {
            "Install 7-Zip from https://www.7-zip.org/ and make sure 7z.exe is on PATH.".to_string()
        }
        (ToolKind::Archiver, "macos") => "Install 7-Zip with Homebrew:\n  brew install sevenzip".to_string(),
        (ToolKind::Archiver, _) => {
            "Install 7-Zip with your package manager, for example:\n  sudo apt install 7zip\n  sudo dnf install p7zip p7zip-plugins\n  sudo pacman -S 7zip".to_string()
        }
        (ToolKind::Parity, "windows") => {
            "Download par2cmdline from https://github.com/Parchive/par2cmdline/releases and put par2.exe on PATH.".to_string()
        }
        (ToolKind::Parity, "macos") => "Install par2 with Homebrew:\n  brew install par2".to_string(),
        (ToolKind::Parity, _) => {
            "Install par2 with your package manager, for example:\n  sudo apt install par2\n  sudo dnf install par2cmdline\n  sudo pacman -S par2cmdline".to_string()
        }
    }
}
