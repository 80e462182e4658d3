//! The client's decrypted view of a reply chunk, distinct from the
//! encrypted wire `Reply` event.

use askexperts_types::AskExpertsError;
use futures::stream::BoxStream;

#[derive(Debug, Clone)]
pub struct ClientReply {
    pub text: String,
    pub done: bool,
    pub error: Option<String>,
}

pub type ReplyStream = BoxStream<'static, Result<ClientReply, AskExpertsError>>;
