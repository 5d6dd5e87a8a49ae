use rand::Rng;

/// Alphabet avoiding visually confusable characters (0/O, 1/I/L), mirroring
/// the "clean" room-code alphabet pattern. At the configured default length
/// of 8 this yields `log2(32^8)` ≈ 40 bits; spec.md §4.6 asks for "≥48 bits
/// of entropy, rendered as base32" — see DESIGN.md for why this crate
/// generates directly from a base32-sized alphabet instead of encoding raw
/// bytes through a `base32`/`base64` crate, and uses `length` 10 by default
/// to clear the 48-bit bar (`log2(32^10)` = 50 bits).
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Mint an unguessable room token of `length` characters.
pub fn generate_room_id(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_use_only_the_clean_alphabet() {
        let id = generate_room_id(10);
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| ALPHABET.contains(&(c as u8))));
    }

    #[test]
    fn ten_characters_clears_48_bits_of_entropy() {
        let bits = (ALPHABET.len() as f64).log2() * 10.0;
        assert!(bits >= 48.0, "expected >=48 bits, got {bits}");
    }

    #[test]
    fn zero_length_yields_empty_string() {
        assert_eq!(generate_room_id(0), "");
    }
}
