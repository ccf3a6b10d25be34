use clap::Parser;
use std::path::PathBuf;

/// Descramble an ARIB STD-B25 MPEG transport stream into a clear stream.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Path of the scrambled source transport stream.
    #[arg(required = true)]
    pub src: PathBuf,

    /// Path for the descrambled output stream.
    /// An existing file will be truncated.
    #[arg(required = true)]
    pub dst: PathBuf,

    /// MULTI2 descramble round count.
    #[arg(short, long, default_value_t = 4)]
    pub round: i32,

    /// Null (padding) stream handling.
    /// 0: keep null stream, 1: strip null stream.
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub strip: u8,

    /// EMM handling.
    /// 0: ignore EMM, 1: send EMM to B-CAS card.
    #[arg(short = 'm', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub emm: u8,

    /// Power-on control info.
    /// 0: do nothing additionally, 1: show B-CAS EMM receiving requests after the run.
    #[arg(short = 'p', long = "power-ctrl", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub power_ctrl: u8,

    /// Processing status on stderr.
    /// 0: silent, 1: show progress.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_usage_text() {
        let args = Args::parse_from(["b25", "src.m2t", "dst.m2t"]);
        assert_eq!(args.round, 4);
        assert_eq!(args.strip, 0);
        assert_eq!(args.emm, 0);
        assert_eq!(args.power_ctrl, 1);
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn accepts_attached_and_separate_values() {
        let args = Args::parse_from(["b25", "-r8", "-s", "1", "-v0", "src.m2t", "dst.m2t"]);
        assert_eq!(args.round, 8);
        assert_eq!(args.strip, 1);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn rejects_unknown_flags_and_missing_paths() {
        assert!(Args::try_parse_from(["b25", "-z", "src", "dst"]).is_err());
        assert!(Args::try_parse_from(["b25", "src.m2t"]).is_err());
        assert!(Args::try_parse_from(["b25", "-s2", "src", "dst"]).is_err());
    }
}
