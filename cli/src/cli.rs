use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xiaoli_shared::MediaKind;

#[derive(Parser, Debug)]
#[command(name = "xl-cli", version, about = "小李生活志 data layer CLI")]
pub struct Cli {
    /// Backend API base URL (overrides XIAOLI_API_BASE).
    #[arg(long, global = true)]
    pub api_base: Option<String>,
    /// Cookie header sent by the simulated browser, e.g.
    /// `NEXT_LOCALE=zh; xiaoli_session=abc`.
    #[arg(long, global = true, default_value = "")]
    pub cookie: String,
    /// Request timeout in milliseconds (overrides XIAOLI_REQUEST_TIMEOUT_MS).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Site sections in the resolved locale.
    Sections,
    /// Profile of the session owner.
    Profile,
    /// Bookmarked blogs.
    SavedBlogs,
    /// Payment history.
    Payments,
    /// Media picker operations.
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },
    /// Show the locale the cookie header resolves to.
    Locale,
}

#[derive(Subcommand, Debug)]
pub enum MediaCommands {
    /// List uploaded assets of one kind.
    List {
        /// image, video, audio or document.
        #[arg(long)]
        kind: MediaKind,
    },
    /// Upload a local file through the picker of one kind.
    Upload {
        /// image, video, audio or document.
        #[arg(long)]
        kind: MediaKind,
        /// File to upload.
        #[arg(long)]
        file: PathBuf,
        /// MIME type; guessed from the file extension when omitted.
        #[arg(long)]
        mime: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "xl-cli",
            "sections",
            "--cookie",
            "NEXT_LOCALE=zh",
            "--timeout-ms",
            "500",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Commands::Sections));
        assert_eq!(cli.cookie, "NEXT_LOCALE=zh");
        assert_eq!(cli.timeout_ms, Some(500));
        assert!(cli.api_base.is_none());
    }

    #[test]
    fn media_upload_parses_kind() {
        let cli = Cli::try_parse_from([
            "xl-cli",
            "media",
            "upload",
            "--kind",
            "Image",
            "--file",
            "cover.png",
        ])
        .expect("parse");
        match cli.command {
            Commands::Media {
                command: MediaCommands::Upload {
                    kind,
                    file,
                    mime,
                },
            } => {
                assert_eq!(kind, MediaKind::Image);
                assert_eq!(file, PathBuf::from("cover.png"));
                assert!(mime.is_none());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_media_kind_is_rejected() {
        assert!(Cli::try_parse_from(["xl-cli", "media", "list", "--kind", "gif"]).is_err());
    }
}
