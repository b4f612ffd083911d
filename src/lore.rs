//! Streaming lore-oracle boundary.
//!
//! The Void Sanctum lets the player ask the oracle about the world. Answers
//! arrive as a stream of text chunks from some backend (network, canned
//! script). The sim side only sees `LoreClient`; `LoreSession` merges the
//! stream into a presentable transcript and guarantees a single in-flight
//! query at a time.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

/// Shown when the backend fails or disconnects mid-answer.
pub const ORACLE_SILENT: &str =
    "The echoes are silent... a disturbance in the void prevents a clear answer.";

/// One piece of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoreChunk {
    Text(String),
    Done,
    Failed,
}

pub trait LoreClient {
    /// Start answering `query`. Chunks arrive on the returned channel; the
    /// stream ends with `Done` or `Failed`. Dropping the sender without a
    /// terminator counts as a failure.
    fn ask(&mut self, query: &str) -> Receiver<LoreChunk>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Streaming,
}

/// Presentation state for the oracle screen. Polled once per frame.
pub struct LoreSession {
    client: Box<dyn LoreClient>,
    state: SessionState,
    stream: Option<Receiver<LoreChunk>>,
    answer: String,
}

impl LoreSession {
    pub fn new(client: Box<dyn LoreClient>) -> Self {
        Self {
            client,
            state: SessionState::Idle,
            stream: None,
            answer: String::new(),
        }
    }

    /// Submit a query. Ignored while an answer is still streaming.
    pub fn ask(&mut self, query: &str) {
        if self.state == SessionState::Streaming {
            log::warn!("oracle query dropped, previous answer still streaming");
            return;
        }
        log::info!("oracle query: {query}");
        self.answer.clear();
        self.stream = Some(self.client.ask(query));
        self.state = SessionState::Streaming;
    }

    /// Drain whatever chunks have arrived since the last poll.
    pub fn poll(&mut self) {
        let Some(stream) = &self.stream else { return };
        loop {
            match stream.try_recv() {
                Ok(LoreChunk::Text(text)) => self.answer.push_str(&text),
                Ok(LoreChunk::Done) => {
                    self.state = SessionState::Idle;
                    self.stream = None;
                    return;
                }
                Ok(LoreChunk::Failed) => {
                    self.fail();
                    return;
                }
                Err(std::sync::mpsc::TryRecvError::Empty) => return,
                Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                    self.fail();
                    return;
                }
            }
        }
    }

    fn fail(&mut self) {
        log::warn!("oracle stream failed");
        self.answer = ORACLE_SILENT.to_string();
        self.state = SessionState::Idle;
        self.stream = None;
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Offline backend: replies with a fixed script, word by word, on a thread.
/// Used by the headless demo and anywhere no real oracle is wired up.
pub struct CannedOracle {
    pub delay: Duration,
}

impl Default for CannedOracle {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(30),
        }
    }
}

const CANNED_ANSWER: &str = "Long before the arena, the void sang. The seven \
who guard its gates were not born; they condensed out of the song's last \
seven notes. Defeat them all and the song begins again.";

impl LoreClient for CannedOracle {
    fn ask(&mut self, _query: &str) -> Receiver<LoreChunk> {
        let (tx, rx) = channel();
        let delay = self.delay;
        thread::spawn(move || stream_words(&tx, CANNED_ANSWER, delay));
        rx
    }
}

fn stream_words(tx: &Sender<LoreChunk>, answer: &str, delay: Duration) {
    for word in answer.split_inclusive(' ') {
        if tx.send(LoreChunk::Text(word.to_string())).is_err() {
            return;
        }
        thread::sleep(delay);
    }
    let _ = tx.send(LoreChunk::Done);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedClient {
        chunks: Vec<LoreChunk>,
    }

    impl LoreClient for ScriptedClient {
        fn ask(&mut self, _query: &str) -> Receiver<LoreChunk> {
            let (tx, rx) = channel();
            for chunk in self.chunks.drain(..) {
                tx.send(chunk).expect("send");
            }
            rx
        }
    }

    #[test]
    fn chunks_merge_into_answer() {
        let client = ScriptedClient {
            chunks: vec![
                LoreChunk::Text("the void ".into()),
                LoreChunk::Text("remembers".into()),
                LoreChunk::Done,
            ],
        };
        let mut session = LoreSession::new(Box::new(client));
        session.ask("what is the void?");
        session.poll();
        assert!(!session.is_streaming());
        assert_eq!(session.answer(), "the void remembers");
    }

    #[test]
    fn failure_shows_fallback_message() {
        let client = ScriptedClient {
            chunks: vec![LoreChunk::Text("the tru".into()), LoreChunk::Failed],
        };
        let mut session = LoreSession::new(Box::new(client));
        session.ask("who made the bosses?");
        session.poll();
        assert_eq!(session.answer(), ORACLE_SILENT);
    }

    #[test]
    fn dropped_stream_counts_as_failure() {
        let client = ScriptedClient {
            chunks: vec![LoreChunk::Text("partial".into())],
        };
        let mut session = LoreSession::new(Box::new(client));
        session.ask("anything");
        session.poll();
        assert_eq!(session.answer(), ORACLE_SILENT);
        assert!(!session.is_streaming());
    }

    #[test]
    fn second_query_waits_for_the_first() {
        struct Pending;
        impl LoreClient for Pending {
            fn ask(&mut self, _query: &str) -> Receiver<LoreChunk> {
                let (tx, rx) = channel();
                std::mem::forget(tx);
                rx
            }
        }
        let mut session = LoreSession::new(Box::new(Pending));
        session.ask("first");
        session.ask("second");
        session.poll();
        assert!(session.is_streaming());
    }

    #[test]
    fn canned_oracle_streams_to_completion() {
        let mut oracle = CannedOracle {
            delay: Duration::from_millis(0),
        };
        let rx = oracle.ask("tell me of the seven");
        let mut answer = String::new();
        loop {
            match rx.recv().expect("recv") {
                LoreChunk::Text(text) => answer.push_str(&text),
                LoreChunk::Done => break,
                LoreChunk::Failed => panic!("canned oracle failed"),
            }
        }
        assert_eq!(answer, CANNED_ANSWER);
    }
}
