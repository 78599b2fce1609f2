//! Stored-block DEFLATE encoding.
//!
//! Wraps data in uncompressed (type 0) blocks. Any conforming inflater
//! accepts the output, which makes it a dependable way to produce DEFLATE
//! members and payloads without a compressor.

/// Largest payload a single stored block can carry.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Encode `data` as a raw DEFLATE stream of stored blocks.
///
/// Empty input still yields one final, empty block.
pub fn deflate_stored(data: &[u8]) -> Vec<u8> {
    let blocks = data.len().div_ceil(MAX_STORED_BLOCK).max(1);
    let mut output = Vec::with_capacity(data.len() + blocks * 5);

    let mut chunks = data.chunks(MAX_STORED_BLOCK).peekable();
    if chunks.peek().is_none() {
        write_block(&mut output, &[], true);
        return output;
    }

    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        write_block(&mut output, chunk, last);
    }

    output
}

fn write_block(output: &mut Vec<u8>, chunk: &[u8], last: bool) {
    // BFINAL in bit 0, BTYPE=00, then padding to the byte boundary.
    output.push(u8::from(last));
    let len = chunk.len() as u16;
    output.extend_from_slice(&len.to_le_bytes());
    output.extend_from_slice(&(!len).to_le_bytes());
    output.extend_from_slice(chunk);
}
