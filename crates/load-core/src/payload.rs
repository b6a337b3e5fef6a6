use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a generated field may contain: A-Z, a-z and space.
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz ";

/// Length of every generated field.
pub const FIELD_LEN: usize = 10;

/// Draw `FIELD_LEN` characters independently and uniformly from `ALPHABET`.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..FIELD_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Body of `POST /author`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorPayload {
    pub full_name: String,
    pub nick_name: String,
    pub specialization: String,
}

impl AuthorPayload {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let full_name = random_string(rng);
        let nick_name = random_string(rng);
        let specialization = random_string(rng);
        Self {
            full_name,
            nick_name,
            specialization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_field(s: &str) {
        assert_eq!(s.chars().count(), FIELD_LEN, "bad length: {:?}", s);
        assert!(
            s.bytes().all(|b| ALPHABET.contains(&b)),
            "character outside alphabet: {:?}",
            s
        );
    }

    #[test]
    fn test_alphabet_has_53_symbols() {
        assert_eq!(ALPHABET.len(), 53);
    }

    #[test]
    fn test_random_string_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            assert_field(&random_string(&mut rng));
        }
    }

    #[test]
    fn test_every_symbol_eventually_drawn() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 53];
        for _ in 0..2000 {
            for b in random_string(&mut rng).bytes() {
                let idx = ALPHABET.iter().position(|&a| a == b).unwrap();
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "some symbols never drawn");
    }

    #[test]
    fn test_payload_has_exactly_three_keys() {
        let mut rng = rand::thread_rng();
        let payload = AuthorPayload::generate(&mut rng);
        assert_field(&payload.full_name);
        assert_field(&payload.nick_name);
        assert_field(&payload.specialization);

        let value = serde_json::to_value(&payload).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["full_name", "nick_name", "specialization"]);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = AuthorPayload::generate(&mut StdRng::seed_from_u64(42));
        let b = AuthorPayload::generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
