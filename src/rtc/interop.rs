//! Workaround for Asterisk's malformed SDP answers.
//!
//! Asterisk downgrades the audio transport proto in its answer even when the
//! answer carries a DTLS fingerprint. When the workaround is enabled and we
//! placed the call, the proto token from our own committed offer is spliced
//! back over the answer's before the body reaches the engine.

/// Rewrite the audio proto token of `body` to match `local_sdp`.
///
/// Pure text transform. Returns the corrected body, or `None` when nothing
/// applies: no fingerprint attribute in the body, no parseable
/// `m=audio <port> <proto>` line on either side, or the proto tokens already
/// agree. Callers keep the body unchanged on `None`.
pub fn correct_audio_proto(body: &str, local_sdp: &str) -> Option<String> {
    if !body.contains("a=fingerprint") {
        return None;
    }

    let (local_start, local_end) = audio_proto_span(local_sdp)?;
    let local_proto = &local_sdp[local_start..local_end];

    let (start, end) = audio_proto_span(body)?;
    if &body[start..end] == local_proto {
        return None;
    }

    tracing::debug!(
        "rewriting audio proto {} -> {}",
        &body[start..end],
        local_proto
    );
    let mut out = String::with_capacity(body.len() + local_proto.len());
    out.push_str(&body[..start]);
    out.push_str(local_proto);
    out.push_str(&body[end..]);
    Some(out)
}

/// Byte range of the proto token in the first `m=audio <port> <proto>` line.
fn audio_proto_span(sdp: &str) -> Option<(usize, usize)> {
    const PREFIX: &str = "m=audio ";
    let bytes = sdp.as_bytes();
    let mut pos = 0;

    while let Some(found) = sdp[pos..].find(PREFIX) {
        let at = pos + found;
        pos = at + 1;

        // anchored to a line start
        if at > 0 && bytes[at - 1] != b'\n' {
            continue;
        }

        let mut i = at + PREFIX.len();
        let port_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == port_start || i >= bytes.len() || bytes[i] != b' ' {
            continue;
        }

        let proto_start = i + 1;
        let mut j = proto_start;
        while j < bytes.len() && is_proto_byte(bytes[j]) {
            j += 1;
        }
        if j > proto_start {
            return Some((proto_start, j));
        }
    }

    None
}

fn is_proto_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'/'
}
