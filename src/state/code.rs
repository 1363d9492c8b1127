use rand::Rng;

/// Alphabet of human-readable room codes.
pub const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// URL-safe alphabet for short opaque identifiers.
pub const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_-";

/// Draw `size` characters uniformly from `alphabet`.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], size: usize) -> String {
    (0..size)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect()
}

/// Generate a room code of `size` characters using the thread-local RNG.
pub fn room_code(size: usize) -> String {
    random_code(&mut rand::rng(), ROOM_CODE_ALPHABET, size)
}
