//! Target classification.
//!
//! A decoded target is sorted into one of three kinds. The kind drives both
//! which outbound headers are sent and how the upstream response is shaped.

use url::Url;

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const OPAQUE_CONTENT_TYPE: &str = "application/octet-stream";

/// What a proxied target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// An `.m3u8` playlist, buffered and rewritten.
    Manifest,
    /// An immutable media chunk, streamed through. Carries the content type
    /// used when upstream does not send one.
    Segment { content_type: &'static str },
    /// Anything else, relayed verbatim.
    Other,
}

impl TargetKind {
    pub fn default_content_type(&self) -> &'static str {
        match self {
            TargetKind::Manifest => MANIFEST_CONTENT_TYPE,
            TargetKind::Segment { content_type } => *content_type,
            TargetKind::Other => OPAQUE_CONTENT_TYPE,
        }
    }
}

/// Classify a target by the extension of its path. Query and fragment are
/// ignored.
pub fn classify(target: &Url) -> TargetKind {
    let file = target.path().rsplit('/').next().unwrap_or_default();
    let Some((_, ext)) = file.rsplit_once('.') else {
        return TargetKind::Other;
    };

    match ext.to_ascii_lowercase().as_str() {
        "m3u8" => TargetKind::Manifest,
        "ts" => TargetKind::Segment { content_type: "video/mp2t" },
        "m4s" | "mp4" => TargetKind::Segment { content_type: "video/mp4" },
        "aac" => TargetKind::Segment { content_type: "audio/aac" },
        "vtt" => TargetKind::Segment { content_type: "text/vtt" },
        "key" => TargetKind::Segment { content_type: OPAQUE_CONTENT_TYPE },
        _ => TargetKind::Other,
    }
}

/// Whether a raw, undecoded `url` parameter names a manifest. Used when the
/// target could not be parsed and errors still need a manifest-shaped body.
pub fn mentions_manifest(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(".m3u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> TargetKind {
        classify(&Url::parse(s).unwrap())
    }

    #[test]
    fn manifests_match_with_and_without_query() {
        assert_eq!(kind("https://a.example/live/index.m3u8"), TargetKind::Manifest);
        assert_eq!(kind("https://a.example/live/INDEX.M3U8?token=x"), TargetKind::Manifest);
    }

    #[test]
    fn segment_extensions_carry_content_types() {
        assert_eq!(
            kind("https://a.example/seg/001.ts?hdnts=1"),
            TargetKind::Segment { content_type: "video/mp2t" }
        );
        assert_eq!(
            kind("https://a.example/seg/init.m4s"),
            TargetKind::Segment { content_type: "video/mp4" }
        );
        assert_eq!(
            kind("https://a.example/subs/en.vtt"),
            TargetKind::Segment { content_type: "text/vtt" }
        );
        assert_eq!(kind("https://a.example/k/1.key").default_content_type(), OPAQUE_CONTENT_TYPE);
    }

    #[test]
    fn query_does_not_leak_into_classification() {
        assert_eq!(kind("https://a.example/play?file=x.m3u8"), TargetKind::Other);
        assert_eq!(kind("https://a.example/"), TargetKind::Other);
        assert_eq!(kind("https://a.example/dir.v2/readme"), TargetKind::Other);
    }

    #[test]
    fn raw_manifest_detection_is_case_insensitive() {
        assert!(mentions_manifest("https%3A%2F%2Fa.example%2FMaster.M3U8"));
        assert!(!mentions_manifest("https://a.example/seg.ts"));
    }
}
