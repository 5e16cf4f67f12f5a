/// Which file to pull out of `hytale-downloader.zip` for the host, and how to
/// store it under `bin/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloaderBinary {
    /// Entry name inside the downloader archive.
    pub entry_name: &'static str,
    /// File name of the extracted binary under `bin/`.
    pub file_name: &'static str,
    pub needs_executable_bit: bool,
}

const WINDOWS: DownloaderBinary = DownloaderBinary {
    entry_name: "hytale-downloader-windows-amd64.exe",
    file_name: "hytale-downloader.exe",
    needs_executable_bit: false,
};

const LINUX_AMD64: DownloaderBinary = DownloaderBinary {
    entry_name: "hytale-downloader-linux-amd64",
    file_name: "hytale-downloader",
    needs_executable_bit: true,
};

/// Any OS identifier mentioning Windows gets the `.exe`; everything else is
/// treated as Linux amd64.
pub fn select_for_os(os: &str) -> DownloaderBinary {
    if os.to_ascii_lowercase().contains("windows") {
        WINDOWS
    } else {
        LINUX_AMD64
    }
}

pub fn current_platform() -> DownloaderBinary {
    select_for_os(std::env::consts::OS)
}
