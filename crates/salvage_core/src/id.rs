use rand::Rng;
use uuid::Uuid;

use crate::{NodeId, SiteId};

/// Generate a deterministic v4-format UUID from a seeded RNG.
pub fn generate_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

impl NodeId {
    pub fn generate(rng: &mut impl Rng) -> Self {
        NodeId(format!("node_{}", generate_uuid(rng).simple()))
    }
}

impl SiteId {
    pub fn generate(rng: &mut impl Rng) -> Self {
        SiteId(format!("site_{}", generate_uuid(rng).simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn deterministic_uuid_from_same_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let id1 = generate_uuid(&mut rng1);
        let id2 = generate_uuid(&mut rng2);
        assert_eq!(id1, id2);
        assert_eq!(id1.get_version(), Some(uuid::Version::Random));
    }

    #[test]
    fn node_ids_are_prefixed_and_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = NodeId::generate(&mut rng);
        let b = NodeId::generate(&mut rng);
        assert!(a.0.starts_with("node_"));
        assert_ne!(a, b);
        assert!(SiteId::generate(&mut rng).0.starts_with("site_"));
    }
}
