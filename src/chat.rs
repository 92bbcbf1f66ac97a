//! Chat command path: parse -> orchestrate -> compose reply -> notify.
//!
//! Every message ends in exactly one [`ChatOutcome`]. The outcome is fixed
//! before the reply is handed to the notifier, and a failed delivery never
//! changes it.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::command::{BuyFormatError, ChatCommand, CommandParser};
use crate::credentials::{CredentialProvider, Credentials};
use crate::error::{Stage, TradeError};
use crate::metrics;
use crate::model::ChatMessage;
use crate::notifier::{self, Notifier};
use crate::orchestrator::TradeOrchestrator;
use crate::reply::Replies;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownCommand,
    InvalidFormat(BuyFormatError),
    UnsupportedPair,
    InsufficientFunds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    RepliedBalance,
    OrderPlaced { order_id: Option<String> },
    Rejected { reason: RejectReason },
    UpstreamError { stage: Stage },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub outcome: ChatOutcome,
    pub text: String,
}

impl ChatReply {
    fn new(outcome: ChatOutcome, text: String) -> Self {
        Self { outcome, text }
    }
}

pub struct ChatService {
    orchestrator: Arc<TradeOrchestrator>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
    parser: CommandParser,
    replies: Replies,
}

impl ChatService {
    pub fn new(
        orchestrator: Arc<TradeOrchestrator>,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn Notifier>,
        parser: CommandParser,
        replies: Replies,
    ) -> Self {
        Self {
            orchestrator,
            credentials,
            notifier,
            parser,
            replies,
        }
    }

    /// Decide, then deliver the reply best-effort.
    pub async fn handle(&self, message: &ChatMessage) -> ChatReply {
        let reply = self.decide(message).await;
        notifier::deliver(self.notifier.as_ref(), &message.sender_id, &reply.text).await;
        reply
    }

    /// Runs the pipeline for one message without sending anything.
    pub async fn decide(&self, message: &ChatMessage) -> ChatReply {
        let command = self.parser.parse(&message.text);
        metrics::inc_chat_command(command.label());
        info!(sender = %message.sender_id, intent = command.label(), "📩 Chat command");
        debug!(sender = %message.sender_id, text = %message.text, "Chat text");

        match command {
            ChatCommand::Unknown => ChatReply::new(
                ChatOutcome::Rejected {
                    reason: RejectReason::UnknownCommand,
                },
                self.replies.unknown(),
            ),
            ChatCommand::InvalidBuyFormat(reason) => ChatReply::new(
                ChatOutcome::Rejected {
                    reason: RejectReason::InvalidFormat(reason),
                },
                self.replies.invalid_buy(reason),
            ),
            ChatCommand::QueryBalance => match self.resolve(&message.sender_id).await {
                Ok(creds) => self.balance(&creds).await,
                Err(reply) => reply,
            },
            ChatCommand::Buy { asset, amount } => {
                let intent = match self.orchestrator.intent(&asset, amount) {
                    Ok(intent) => intent,
                    Err(_) => {
                        let reason = BuyFormatError::NonPositiveAmount;
                        return ChatReply::new(
                            ChatOutcome::Rejected {
                                reason: RejectReason::InvalidFormat(reason),
                            },
                            self.replies.invalid_buy(reason),
                        );
                    }
                };
                let creds = match self.resolve(&message.sender_id).await {
                    Ok(creds) => creds,
                    Err(reply) => return reply,
                };

                match self.orchestrator.buy(&creds, &intent).await {
                    Ok(order) => ChatReply::new(
                        ChatOutcome::OrderPlaced {
                            order_id: order.order_id.clone(),
                        },
                        self.replies.order_placed(
                            intent.base_asset(),
                            intent.notional(),
                            order.order_id.as_deref(),
                        ),
                    ),
                    Err(err) => self.buy_failed(err),
                }
            }
        }
    }

    async fn resolve(&self, sender: &str) -> Result<Credentials, ChatReply> {
        self.credentials.resolve(sender).await.map_err(|e| {
            warn!(sender, error = %e, "Credential lookup failed");
            metrics::inc_upstream_failure(Stage::Credentials.as_str());
            ChatReply::new(
                ChatOutcome::UpstreamError {
                    stage: Stage::Credentials,
                },
                self.replies.unavailable(),
            )
        })
    }

    async fn balance(&self, creds: &Credentials) -> ChatReply {
        match self.orchestrator.quote_balance(creds).await {
            Ok(amount) => ChatReply::new(ChatOutcome::RepliedBalance, self.replies.balance(amount)),
            Err(_) => ChatReply::new(
                ChatOutcome::UpstreamError {
                    stage: Stage::AccountSnapshot,
                },
                self.replies.balance_failed(),
            ),
        }
    }

    fn buy_failed(&self, err: TradeError) -> ChatReply {
        match err {
            TradeError::UnsupportedPair { base, quote } => ChatReply::new(
                ChatOutcome::Rejected {
                    reason: RejectReason::UnsupportedPair,
                },
                self.replies.unsupported_pair(&base, &quote),
            ),
            TradeError::InsufficientFunds { .. } => ChatReply::new(
                ChatOutcome::Rejected {
                    reason: RejectReason::InsufficientFunds,
                },
                self.replies.insufficient_funds(),
            ),
            TradeError::Validation(_) => {
                let reason = BuyFormatError::NonPositiveAmount;
                ChatReply::new(
                    ChatOutcome::Rejected {
                        reason: RejectReason::InvalidFormat(reason),
                    },
                    self.replies.invalid_buy(reason),
                )
            }
            TradeError::Upstream { stage, .. } => {
                let text = match stage {
                    Stage::AccountSnapshot => self.replies.balance_check_failed(),
                    Stage::OrderSubmission => self.replies.order_failed(),
                    Stage::Credentials => self.replies.unavailable(),
                };
                ChatReply::new(ChatOutcome::UpstreamError { stage }, text)
            }
            TradeError::Configuration(_) => ChatReply::new(
                ChatOutcome::UpstreamError {
                    stage: Stage::Credentials,
                },
                self.replies.unavailable(),
            ),
        }
    }
}
