pub mod base62;
pub mod random;

pub use random::{EntropySource, RandomGenerator, ThreadRngEntropy};

use snip_core::ShortCode;
use std::future::Future;
use tracing::debug;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// uniqueness against stored codes is checked by [`generate_unique`].
pub trait Generator: Send + Sync + 'static {
    /// Generates a well-formed short code.
    fn generate(&self) -> ShortCode;
}

/// Draws codes from `generator` until `exists` reports one as free.
///
/// The loop has no upper bound. With 62^6 possible codes a long streak of
/// collisions is vanishingly unlikely, but callers that need a hard stop
/// should bound it through `exists`. A free answer here is not a
/// reservation: the caller must still register the code with a unique
/// insert and retry on conflict.
pub async fn generate_unique<G, F, Fut, E>(generator: &G, mut exists: F) -> Result<ShortCode, E>
where
    G: Generator + ?Sized,
    F: FnMut(ShortCode) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    loop {
        let code = generator.generate();
        if !exists(code.clone()).await? {
            return Ok(code);
        }
        debug!(code = %code, "generated short code already taken, retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::random::scripted::ScriptedEntropy;
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn skips_codes_reported_as_taken() {
        let generator = RandomGenerator::with_entropy(ScriptedEntropy::new([
            *b"test",
            [0x40, 0, 0, 0],
            [0xFF, 0xFF, 0xFF, 0xFF],
        ]));
        let taken: HashSet<&str> = ["289lyu", "1AfJIW"].into_iter().collect();
        let calls = AtomicUsize::new(0);

        let code = generate_unique(&generator, |code| {
            calls.fetch_add(1, Ordering::SeqCst);
            let hit = taken.contains(code.as_str());
            async move { Ok::<_, ()>(hit) }
        })
        .await
        .unwrap();

        assert_eq!(code.as_str(), "4gfFC3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_errors_propagate() {
        let generator = RandomGenerator::new();

        let err = generate_unique(&generator, |_| async { Err::<bool, _>("store down") })
            .await
            .unwrap_err();

        assert_eq!(err, "store down");
    }

    #[tokio::test]
    async fn bounded_predicate_stops_a_collision_storm() {
        // Every draw collides; the predicate itself enforces the cap.
        let generator = RandomGenerator::with_entropy(ScriptedEntropy::new([*b"test"]));
        let attempts = AtomicUsize::new(0);

        let result = generate_unique(&generator, |_| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n >= 5 {
                    Err("too many collisions")
                } else {
                    Ok(true)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "too many collisions");
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }
}
