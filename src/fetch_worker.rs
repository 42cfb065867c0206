use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
};

use tokio::runtime::Runtime;

use crate::{
    error::FetchError,
    log_util::log_debug,
    question::QuestionPayload,
    question_gateway::QuestionGateway,
    quiz_session::{FetchId, FetchTicket},
};

/// Result of one background gateway call, stamped with the fetch it belongs to.
#[derive(Debug)]
pub struct FetchMessage {
    pub id: FetchId,
    pub result: Result<QuestionPayload, FetchError>,
}

/// Runs gateway requests on background threads and funnels every completion into one channel.
/// Older completions still arrive; the session decides whether they are stale.
#[derive(Debug)]
pub struct FetchWorker {
    sender: Sender<FetchMessage>,
    receiver: Receiver<FetchMessage>,
}

impl Default for FetchWorker {
    fn default() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }
}

impl FetchWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<G>(&self, gateway: G, ticket: FetchTicket)
    where
        G: QuestionGateway + Send + 'static,
    {
        let sender = self.sender.clone();
        log_debug(&format!(
            "FetchWorker: starting fetch {:?} for {}",
            ticket.id, ticket.topic
        ));

        thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let _ = sender.send(FetchMessage {
                        id: ticket.id,
                        result: Err(FetchError::Transport(format!(
                            "failed to build Tokio runtime: {}",
                            err
                        ))),
                    });
                    return;
                }
            };

            let result = runtime.block_on(gateway.fetch_question(ticket.topic.label()));
            drop(runtime);

            if sender
                .send(FetchMessage {
                    id: ticket.id,
                    result,
                })
                .is_err()
            {
                log_debug("FetchWorker: receiver dropped before fetch completed");
            }
        });
    }

    /// Next finished fetch, if any, without blocking.
    pub fn try_next(&self) -> Option<FetchMessage> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            // The worker keeps its own sender, so the channel cannot disconnect while it lives.
            Err(TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    fn next_blocking(&self) -> Option<FetchMessage> {
        self.receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .ok()
    }
}
