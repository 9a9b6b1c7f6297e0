//! # Grove Core Library
//!
//! Deterministic engine for the Grove collective-investment protocol:
//! pooled gardens fund time-boxed strategies that are proposed, voted on,
//! capital-deployed in tranches, and finalized, with profit split among
//! strategist/stewards/LPs and a benchmark-segmented GRV mining reward.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `types` | Core types: Address, Hash, GardenId, StrategyId |
//! | `registry` | Injected protocol registry: governance, keepers, pause flags, asset whitelist |
//! | `oracle` | PriceOracle trait + constant-rate test double |
//! | `operation` | Operation interface: kind tags, trait, registry, mock adapter |
//! | `crypto` | Meta-transaction typed-struct digest + signed request verification |
//! | `tokenomics` | Pure economics: profit split, stake penalty, benchmark segments, emission |
//! | `events` | Typed audit events appended per committed transition |
//! | `state` | ProtocolState facade: garden ledger, strategy lifecycle, rewards engine |
//!
//! ## Execution model
//!
//! Every public entry point on [`state::ProtocolState`] is a serialized,
//! atomic transition: all preconditions are validated before the first
//! mutation, and an error leaves the state untouched. Time enters the
//! engine only through explicit `now` arguments (unix seconds); there is
//! no wall-clock access and no internal concurrency.

pub mod crypto;
pub mod events;
pub mod operation;
pub mod oracle;
pub mod registry;
pub mod state;
pub mod tokenomics;
pub mod types;

use grove_common::MathError;
use thiserror::Error;
use types::{Address, GardenId, StrategyId};

/// Stable failure taxonomy exposed to callers. Lifecycle failures are
/// timing-dependent and may succeed on retry; the other kinds will never
/// succeed as submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AccessControl,
    Lifecycle,
    EconomicBound,
    InputValidation,
}

/// Error type for all engine transitions.
///
/// Every variant maps onto one [`ErrorKind`] via [`CoreError::kind`];
/// downstream tooling dispatches on the kind, clients on the variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ── access control ──────────────────────────────────────
    #[error("caller is not the protocol governance")]
    NotGovernance,

    #[error("caller is not an allow-listed keeper")]
    NotKeeper,

    #[error("caller is not authorized to deposit into this garden")]
    NotAuthorized,

    #[error("garden is paused")]
    GardenPaused,

    #[error("strategy is paused")]
    StrategyPaused,

    #[error("reserve asset is not whitelisted")]
    AssetNotWhitelisted,

    // ── lifecycle ───────────────────────────────────────────
    #[error("voting already resolved for this strategy")]
    AlreadyResolved,

    #[error("strategy already finalized")]
    AlreadyFinalized,

    #[error("voting has not been resolved yet")]
    VotingNotResolved,

    #[error("strategy has no executed capital")]
    NotExecuted,

    #[error("voting window closed at {0}")]
    VotingWindowClosed(u64),

    #[error("cooldown active until {0}")]
    CooldownActive(u64),

    #[error("deposit hardlock active until {0}")]
    HardlockNotExpired(u64),

    #[error("strategy expired at {0}")]
    StrategyExpired(u64),

    #[error("strategy matures at {0}")]
    StrategyNotMatured(u64),

    #[error("rewards already claimed for this strategy")]
    AlreadyClaimed,

    #[error("strategy rewards not settled")]
    NotFinalized,

    #[error("unsupported schema version {0}")]
    UnsupportedSchema(u32),

    // ── economic bounds ─────────────────────────────────────
    #[error("keeper fee {fee} exceeds maximum {max}")]
    FeeTooHigh { fee: u128, max: u128 },

    #[error("output {actual} below minimum {min}")]
    SlippageExceeded { actual: u128, min: u128 },

    #[error("minted shares {actual} below minimum {min}")]
    InsufficientShares { actual: u128, min: u128 },

    #[error("deposit exceeds garden limit {0}")]
    DepositLimitExceeded(u128),

    #[error("capital would exceed max requested {0}")]
    CapitalCapExceeded(u128),

    #[error("capital would exceed allocation cap {0}")]
    AllocationCapExceeded(u128),

    #[error("garden lacks free liquidity: have {have}, need {need}")]
    InsufficientLiquidity { have: u128, need: u128 },

    #[error("unlocked balance {unlocked} below required {required}")]
    InsufficientUnlockedBalance { unlocked: u128, required: u128 },

    #[error("caller reserve balance {have} below required {need}")]
    InsufficientFunds { have: u128, need: u128 },

    #[error("stake {stake} below minimum {min}")]
    StakeTooLow { stake: u128, min: u128 },

    #[error("share price {price_wad} outside tolerance of reference {reference_wad}")]
    PriceOutOfBounds { price_wad: u128, reference_wad: u128 },

    #[error("vote weight {votes} below quorum {quorum}")]
    QuorumNotReached { votes: u128, quorum: u128 },

    #[error("{actual} voters below minimum {min}")]
    NotEnoughVoters { actual: usize, min: usize },

    #[error("negative votes outweigh positive votes")]
    InsufficientSupport,

    #[error("profit sharing sum {0} bps outside tolerance band")]
    ProfitSharingOutOfTolerance(u128),

    // ── input validation ────────────────────────────────────
    #[error("nonce {got} does not match expected {expected}")]
    InvalidNonce { got: u64, expected: u64 },

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("strategy requires at least one operation")]
    EmptyOperations,

    #[error("strategy duration {0} outside configured bounds")]
    DurationOutOfBounds(u64),

    #[error("unknown garden {0}")]
    UnknownGarden(GardenId),

    #[error("unknown strategy {0}")]
    UnknownStrategy(StrategyId),

    #[error("no integration registered at {0}")]
    UnknownIntegration(Address),

    #[error("voters and weights length mismatch")]
    VoteMismatch,

    #[error("duplicate vote from {0}")]
    DuplicateVote(Address),

    #[error("invalid time window")]
    InvalidWindow,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("arithmetic failure: {0}")]
    Math(#[from] MathError),

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("oracle failure: {0}")]
    OracleFailure(String),
}

impl CoreError {
    /// Map this error onto the stable failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use CoreError::*;
        match self {
            NotGovernance | NotKeeper | NotAuthorized | GardenPaused | StrategyPaused
            | AssetNotWhitelisted => ErrorKind::AccessControl,

            AlreadyResolved
            | AlreadyFinalized
            | VotingNotResolved
            | NotExecuted
            | VotingWindowClosed(_)
            | CooldownActive(_)
            | HardlockNotExpired(_)
            | StrategyExpired(_)
            | StrategyNotMatured(_)
            | AlreadyClaimed
            | NotFinalized
            | UnsupportedSchema(_) => ErrorKind::Lifecycle,

            FeeTooHigh { .. }
            | SlippageExceeded { .. }
            | InsufficientShares { .. }
            | DepositLimitExceeded(_)
            | CapitalCapExceeded(_)
            | AllocationCapExceeded(_)
            | InsufficientLiquidity { .. }
            | InsufficientUnlockedBalance { .. }
            | InsufficientFunds { .. }
            | StakeTooLow { .. }
            | PriceOutOfBounds { .. }
            | QuorumNotReached { .. }
            | NotEnoughVoters { .. }
            | InsufficientSupport
            | ProfitSharingOutOfTolerance(_) => ErrorKind::EconomicBound,

            InvalidNonce { .. }
            | InvalidSignature
            | ZeroAmount
            | EmptyOperations
            | DurationOutOfBounds(_)
            | UnknownGarden(_)
            | UnknownStrategy(_)
            | UnknownIntegration(_)
            | VoteMismatch
            | DuplicateVote(_)
            | InvalidWindow
            | InvalidParameter(_)
            | Math(_)
            | OperationFailed(_)
            | OracleFailure(_) => ErrorKind::InputValidation,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

pub use state::ProtocolState;
