//! Streaming secret redaction for child stdio
//!
//! A multi-pattern automaton over the secret plaintexts, plus a buffer that
//! retains the last `max_pattern_len - 1` bytes so a secret split across
//! write boundaries still matches. Matches are rewritten to
//! [`REDACTED_PLACEHOLDER`].

use std::io::{self, Write};
use std::sync::Mutex;

use aho_corasick::{AhoCorasick, MatchKind};

pub const REDACTED_PLACEHOLDER: &str = "[REDACTED_BY_JINGUI]";

#[derive(Debug, thiserror::Error)]
pub enum MaskerError {
    #[error("failed to build masking automaton: {0}")]
    Build(#[from] aho_corasick::BuildError),
}

struct Inner<W: Write> {
    out: W,
    matcher: Option<AhoCorasick>,
    max_pattern_len: usize,
    buf: Vec<u8>,
}

/// Wraps a writer and replaces any occurrence of the secret values. The
/// inner mutex lets both stdio pipes share one masker if they want to.
pub struct MaskingWriter<W: Write> {
    inner: Mutex<Inner<W>>,
}

impl<W: Write> MaskingWriter<W> {
    /// Build a masker over `secrets`. Empty patterns are dropped first:
    /// they match nothing and would zero out `max_pattern_len`, underflowing
    /// the safe-end arithmetic.
    pub fn new(out: W, secrets: &[String]) -> Result<Self, MaskerError> {
        let patterns: Vec<&str> = secrets
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();

        let (matcher, max_pattern_len) = if patterns.is_empty() {
            (None, 0)
        } else {
            let matcher = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&patterns)?;
            let max_len = patterns.iter().map(|p| p.len()).max().unwrap_or(0);
            (Some(matcher), max_len)
        };

        Ok(MaskingWriter {
            inner: Mutex::new(Inner {
                out,
                matcher,
                max_pattern_len,
                buf: Vec::new(),
            }),
        })
    }

    /// Append bytes, emitting whatever can no longer start a pending match.
    pub fn write_bytes(&self, data: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock().expect("masker lock poisoned");
        if inner.matcher.is_none() {
            return inner.out.write_all(data);
        }
        inner.buf.extend_from_slice(data);
        process(&mut inner, false)
    }

    /// Emit the entire buffer with final-pass matching and flush downstream.
    pub fn finish(&self) -> io::Result<()> {
        let mut inner = self.inner.lock().expect("masker lock poisoned");
        if inner.matcher.is_some() {
            process(&mut inner, true)?;
        }
        inner.out.flush()
    }

    /// Consume the masker, returning the wrapped writer. Test helper.
    #[cfg(test)]
    fn into_inner(self) -> W {
        self.inner.into_inner().expect("masker lock poisoned").out
    }
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write_bytes(data)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Held-back bytes stay put: an intermediate flush must not split a
        // pending match. finish() does the final pass.
        let mut inner = self.inner.lock().expect("masker lock poisoned");
        inner.out.flush()
    }
}

fn process<W: Write>(inner: &mut Inner<W>, flush_all: bool) -> io::Result<()> {
    let Some(matcher) = inner.matcher.as_ref() else {
        return Ok(());
    };
    if inner.buf.is_empty() {
        return Ok(());
    }

    // Bytes past safe_end could be the start of a match that finishes in a
    // later write, so they stay buffered.
    let safe_end = if flush_all {
        inner.buf.len()
    } else {
        match inner.buf.len().checked_sub(inner.max_pattern_len - 1) {
            Some(end) if end > 0 => end,
            _ => return Ok(()),
        }
    };

    // Scan the whole buffer, not just the safe prefix, so matches that
    // straddle the boundary are seen and consumed in full.
    let matches: Vec<(usize, usize)> = matcher
        .find_iter(&inner.buf)
        .map(|m| (m.start(), m.end()))
        .collect();

    let mut result: Vec<u8> = Vec::new();
    let mut pos = 0usize;
    let mut consumed_end = safe_end;

    for (start, end) in matches {
        if start < pos {
            continue;
        }
        if start >= safe_end && !flush_all {
            break;
        }

        result.extend_from_slice(&inner.buf[pos..start]);
        result.extend_from_slice(REDACTED_PLACEHOLDER.as_bytes());
        pos = end;

        if end > consumed_end {
            consumed_end = end;
        }
    }

    if pos < safe_end {
        result.extend_from_slice(&inner.buf[pos..safe_end]);
    }

    if !result.is_empty() {
        inner.out.write_all(&result)?;
    }

    inner.buf.drain(..consumed_end);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn masker(secrets: &[&str]) -> MaskingWriter<Vec<u8>> {
        let secrets: Vec<String> = secrets.iter().map(|s| s.to_string()).collect();
        MaskingWriter::new(Vec::new(), &secrets).unwrap()
    }

    fn collect(mw: MaskingWriter<Vec<u8>>) -> String {
        String::from_utf8(mw.into_inner()).unwrap()
    }

    #[test]
    fn test_basic_redaction() {
        let mw = masker(&["SECRET123", "TOKEN456"]);
        mw.write_bytes(b"hello SECRET123 world TOKEN456 end").unwrap();
        mw.finish().unwrap();
        assert_eq!(
            collect(mw),
            "hello [REDACTED_BY_JINGUI] world [REDACTED_BY_JINGUI] end"
        );
    }

    #[test]
    fn test_chunk_boundary() {
        let mw = masker(&["MYSECRET"]);
        mw.write_bytes(b"prefix MYSE").unwrap();
        mw.write_bytes(b"CRET suffix").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "prefix [REDACTED_BY_JINGUI] suffix");
    }

    #[test]
    fn test_no_secrets_passthrough() {
        let mw = masker(&[]);
        mw.write_bytes(b"passthrough").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "passthrough");
    }

    #[test]
    fn test_multiple_matches() {
        let mw = masker(&["AAA", "BBB"]);
        mw.write_bytes(b"AAA and BBB and AAA").unwrap();
        mw.finish().unwrap();
        assert_eq!(
            collect(mw),
            "[REDACTED_BY_JINGUI] and [REDACTED_BY_JINGUI] and [REDACTED_BY_JINGUI]"
        );
    }

    #[test]
    fn test_empty_patterns_filtered() {
        let mw = masker(&["", "SECRET", ""]);
        mw.write_bytes(b"hello SECRET world").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "hello [REDACTED_BY_JINGUI] world");
    }

    #[test]
    fn test_all_empty_patterns_passthrough() {
        let mw = masker(&["", ""]);
        mw.write_bytes(b"passthrough").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "passthrough");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mw = masker(&["MYSECRET"]);
        for b in b"x MYSECRET y" {
            mw.write_bytes(&[*b]).unwrap();
        }
        mw.finish().unwrap();
        assert_eq!(collect(mw), "x [REDACTED_BY_JINGUI] y");
    }

    #[test]
    fn test_overlapping_candidates_prefer_longest() {
        let mw = masker(&["SECRET", "SECRETLONGER"]);
        mw.write_bytes(b"a SECRETLONGER b").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "a [REDACTED_BY_JINGUI] b");
    }

    #[test]
    fn test_trailing_partial_is_flushed_verbatim() {
        let mw = masker(&["MYSECRET"]);
        mw.write_bytes(b"ends with MYSE").unwrap();
        mw.finish().unwrap();
        assert_eq!(collect(mw), "ends with MYSE");
    }

    #[test]
    fn test_random_splits_never_leak() {
        let secret = "SUPERSECRETVALUE";
        let text = format!("prefix {} middle {} suffix", secret, secret);

        let mut seed = [0u8; 64];
        getrandom::getrandom(&mut seed).unwrap();

        for chunk_hint in seed {
            let mw = masker(&[secret]);
            let step = (chunk_hint as usize % 7) + 1;
            for chunk in text.as_bytes().chunks(step) {
                mw.write_bytes(chunk).unwrap();
            }
            mw.finish().unwrap();
            let output = collect(mw);
            assert!(
                !output.contains(secret),
                "secret leaked with chunk size {}",
                step
            );
            assert_eq!(output.matches(REDACTED_PLACEHOLDER).count(), 2);
        }
    }
}
