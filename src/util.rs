use log::{log_enabled, Level};

const MAX_PREVIEW: usize = 64;

/// Trace-log a preview of data passing over the wire.
///
/// Only formats the preview when trace logging is enabled.
pub(crate) fn log_data(data: &[u8]) {
    if !log_enabled!(Level::Trace) {
        return;
    }

    let preview_len = data.len().min(MAX_PREVIEW);
    let preview = String::from_utf8_lossy(&data[..preview_len]);
    let ellipsis = if data.len() > MAX_PREVIEW { "..." } else { "" };

    trace!("{} bytes: {}{}", data.len(), preview.escape_debug(), ellipsis);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_data_does_not_panic_on_non_utf8() {
        log_data(&[0xff, 0xfe, 0x00, b'a']);
        log_data(&[b'x'; 200]);
        log_data(&[]);
    }
}
