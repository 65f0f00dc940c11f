/// Random opaque verification tokens
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS-seeded thread RNG, hex encoded (64 chars)
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
