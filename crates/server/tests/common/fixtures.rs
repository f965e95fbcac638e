//! Test data fixtures.

/// Build a chunk payload of the given length filled with a byte derived
/// from the index, so misordered reassembly is detectable.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub fn patterned_chunk(index: u32, len: usize) -> Vec<u8> {
    vec![b'a' + (index % 26) as u8; len]
}

/// Concatenate patterned chunks in index order.
#[allow(dead_code)]
pub fn patterned_file(lens: &[usize]) -> Vec<u8> {
    lens.iter()
        .enumerate()
        .flat_map(|(index, len)| patterned_chunk(index as u32, *len))
        .collect()
}
