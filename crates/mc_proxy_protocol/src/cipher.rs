//! AES-128/CFB8 stream cipher wrapper. Minecraft reuses the 16-byte shared
//! secret as both the AES key and the CFB initialization vector, so a
//! cipher is constructed from a single `[u8; 16]`.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, BlockSizeUser, KeyIvInit};
use aes::Aes128;

type Enc = cfb8::Encryptor<Aes128>;
type Dec = cfb8::Decryptor<Aes128>;

pub struct CipherCodec {
    encryptor: Enc,
    decryptor: Dec,
}

impl CipherCodec {
    pub fn new(key: &[u8; 16]) -> Self {
        Self {
            encryptor: Enc::new_from_slices(key, key).expect("key and iv are 16 bytes"),
            decryptor: Dec::new_from_slices(key, key).expect("key and iv are 16 bytes"),
        }
    }

    /// Encrypts `data` in place, one CFB-8 block at a time.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for chunk in data.chunks_mut(Enc::block_size()) {
            let block = GenericArray::from_mut_slice(chunk);
            self.encryptor.encrypt_block_mut(block);
        }
    }

    /// Decrypts `data` in place, one CFB-8 block at a time.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for chunk in data.chunks_mut(Dec::block_size()) {
            let block = GenericArray::from_mut_slice(chunk);
            self.decryptor.decrypt_block_mut(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [7u8; 16];
        let mut enc = CipherCodec::new(&key);
        let mut dec = CipherCodec::new(&key);

        let plaintext = b"the quick brown fox jumps over the lazy dog".to_vec();
        let mut buf = plaintext.clone();
        enc.encrypt(&mut buf);
        assert_ne!(buf, plaintext);
        dec.decrypt(&mut buf);
        assert_eq!(buf, plaintext);
    }

    #[test]
    fn encrypts_across_multiple_calls_like_one() {
        let key = [9u8; 16];
        let mut enc_whole = CipherCodec::new(&key);
        let mut enc_split = CipherCodec::new(&key);

        let mut whole = b"0123456789abcdef0123456789abcdef".to_vec();
        enc_whole.encrypt(&mut whole);

        let mut split = b"0123456789abcdef0123456789abcdef".to_vec();
        let (first, second) = split.split_at_mut(10);
        enc_split.encrypt(first);
        enc_split.encrypt(second);

        assert_eq!(whole, split);
    }
}
