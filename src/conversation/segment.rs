//! Sentence buffering for streamed replies.
//!
//! Text deltas arrive at arbitrary split points. [`SentenceBuffer`] regroups
//! them into readable segments: it releases text up to the last punctuation
//! mark that is followed by whitespace (or ends the buffer), and force-flushes
//! once more than `max_pending` characters pile up without a boundary.
//! Concatenating every segment always reproduces the input exactly.

use futures_util::stream::{self, StreamExt};

use super::FragmentStream;

/// Characters that may end a segment.
const BOUNDARY_CHARS: &[char] = &['.', '!', '?', ',', ';', ':', '\n'];

pub const DEFAULT_MAX_PENDING: usize = 30;

#[derive(Debug, Clone)]
pub struct SentenceBuffer {
    pending: String,
    max_pending: usize,
}

impl Default for SentenceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl SentenceBuffer {
    pub fn new(max_pending: usize) -> Self {
        Self { pending: String::new(), max_pending }
    }

    /// Add a delta; returns any segments that became complete.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.pending.push_str(delta);

        let mut out = Vec::new();
        if let Some(cut) = last_boundary(&self.pending) {
            let rest = self.pending.split_off(cut);
            out.push(std::mem::replace(&mut self.pending, rest));
        }
        if self.pending.chars().count() > self.max_pending {
            out.push(std::mem::take(&mut self.pending));
        }
        out
    }

    /// Release whatever is still held.
    pub fn flush(&mut self) -> Option<String> {
        (!self.pending.is_empty()).then(|| std::mem::take(&mut self.pending))
    }
}

/// Byte offset just past the last boundary character that is followed by
/// whitespace or sits at the end of `text`.
fn last_boundary(text: &str) -> Option<usize> {
    let mut found = None;
    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if !BOUNDARY_CHARS.contains(&c) {
            continue;
        }
        let followed_ok = match iter.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if followed_ok {
            found = Some(i + c.len_utf8());
        }
    }
    found
}

/// Regroup a fragment stream into sentence-sized segments.
///
/// Held text is flushed before an error is passed on and when the inner
/// stream ends, so nothing already received is lost.
pub fn by_sentence(inner: FragmentStream) -> FragmentStream {
    stream::unfold(
        Some((inner, SentenceBuffer::default(), Vec::<Result<String, _>>::new())),
        |state| async move {
            let (mut inner, mut buf, mut ready) = state?;
            loop {
                if !ready.is_empty() {
                    let item = ready.remove(0);
                    return Some((item, Some((inner, buf, ready))));
                }
                match inner.next().await {
                    Some(Ok(delta)) => ready.extend(buf.push(&delta).into_iter().map(Ok)),
                    Some(Err(e)) => {
                        ready.extend(buf.flush().map(Ok));
                        ready.push(Err(e));
                    }
                    None => {
                        let last = buf.flush()?;
                        return Some((Ok(last), None));
                    }
                }
            }
        },
    )
    .boxed()
}
