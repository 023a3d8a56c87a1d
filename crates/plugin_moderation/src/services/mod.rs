//! Feature services. Each owns one concern and is shared through
//! [`crate::ModerationContext`].

pub mod chat_filter;
pub mod legal;
pub mod maintenance;
pub mod messages;
pub mod motd;
pub mod player_stats;
pub mod punishments;
pub mod relay;
pub mod reports;
pub mod server_guard;
pub mod spam;
pub mod whitelist;

pub use chat_filter::{ChatFilter, FilterOutcome};
pub use legal::LegalService;
pub use maintenance::MaintenanceService;
pub use messages::MessageService;
pub use motd::MotdService;
pub use player_stats::PlayerStatsService;
pub use punishments::{PunishmentService, Target, WarnOutcome};
pub use relay::ModerationRelay;
pub use reports::ReportService;
pub use server_guard::ServerGuard;
pub use spam::{SpamGuard, SpamVerdict};
pub use whitelist::WhitelistService;
