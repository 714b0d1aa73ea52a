use crate::base62;
use crate::Generator;
use rand::RngCore;
use snip_core::{ShortCode, CODE_LENGTH};
use tracing::trace;

/// A source of random bytes for code generation.
pub trait EntropySource: Send + Sync + 'static {
    fn fill(&self, buf: &mut [u8; 4]);
}

/// Draws from the thread-local CSPRNG (ChaCha seeded from the OS).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngEntropy;

impl EntropySource for ThreadRngEntropy {
    fn fill(&self, buf: &mut [u8; 4]) {
        rand::rng().fill_bytes(buf);
    }
}

/// Generates short codes by base-62 encoding four random bytes.
///
/// Draws that encode to fewer than [`CODE_LENGTH`] characters (about one in
/// five) are discarded and redrawn, so every emitted code has the fixed
/// length. Character distribution is not uniform.
#[derive(Debug, Clone, Default)]
pub struct RandomGenerator<E = ThreadRngEntropy> {
    entropy: E,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::with_entropy(ThreadRngEntropy)
    }
}

impl<E: EntropySource> RandomGenerator<E> {
    pub fn with_entropy(entropy: E) -> Self {
        Self { entropy }
    }
}

impl<E: EntropySource> Generator for RandomGenerator<E> {
    fn generate(&self) -> ShortCode {
        let mut bytes = [0_u8; 4];
        loop {
            self.entropy.fill(&mut bytes);
            let candidate = base62::encode_bytes(&bytes);
            if candidate.len() == CODE_LENGTH {
                return ShortCode::new_unchecked(candidate);
            }
            trace!(candidate = %candidate, "discarding short draw");
        }
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use super::EntropySource;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays a fixed list of draws, then repeats the last one.
    pub(crate) struct ScriptedEntropy {
        draws: Mutex<VecDeque<[u8; 4]>>,
        last: Mutex<[u8; 4]>,
    }

    impl ScriptedEntropy {
        pub(crate) fn new(draws: impl IntoIterator<Item = [u8; 4]>) -> Self {
            Self {
                draws: Mutex::new(draws.into_iter().collect()),
                last: Mutex::new([0xFF; 4]),
            }
        }
    }

    impl EntropySource for ScriptedEntropy {
        fn fill(&self, buf: &mut [u8; 4]) {
            let mut last = self.last.lock();
            if let Some(next) = self.draws.lock().pop_front() {
                *last = next;
            }
            *buf = *last;
        }
    }
}
