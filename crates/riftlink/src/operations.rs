//! The remote operations the client knows by name.
//!
//! Each operation is a marker type implementing [`Operation`]; the
//! matching `RpcClient` methods build the argument list and pick the
//! blocking or non-blocking path. Results the client never inspects stay
//! as raw [`Value`]s.

use riftlink_auth::TokenAcquirer;
use riftlink_protocol::Value;
use riftlink_transport::Connector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::RpcClient;
use crate::dispatch::Operation;
use crate::error::RpcError;

pub const SUMMONER_SERVICE: &str = "summonerService";
pub const PLAYER_STATS_SERVICE: &str = "playerStatsService";
pub const SUMMONER_TEAM_SERVICE: &str = "summonerTeamService";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Publicly visible summoner profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSummoner {
    pub acct_id: i64,
    pub summoner_id: i64,
    pub name: String,
    #[serde(default)]
    pub internal_name: String,
    #[serde(default)]
    pub summoner_level: u32,
    #[serde(default)]
    pub profile_icon_id: i32,
    /// Milliseconds since the epoch, when the server sends it.
    #[serde(default)]
    pub revision_date: Option<i64>,
}

/// The last games an account played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGames {
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Per-game statistics, kept as sent.
    #[serde(default)]
    pub game_statistics: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Operation markers
// ---------------------------------------------------------------------------

macro_rules! operation {
    ($(#[$doc:meta])* $marker:ident, $service:expr, $name:literal, $output:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $marker;

        impl Operation for $marker {
            const SERVICE: &'static str = $service;
            const NAME: &'static str = $name;
            type Output = $output;
        }
    };
}

operation!(
    /// Looks a summoner up by display name. `None` if nobody has that name.
    GetSummonerByName, SUMMONER_SERVICE, "getSummonerByName", Option<PublicSummoner>
);
operation!(GetRecentGames, PLAYER_STATS_SERVICE, "getRecentGames", RecentGames);
operation!(
    GetAllPublicSummonerDataByAccount,
    SUMMONER_SERVICE,
    "getAllPublicSummonerDataByAccount",
    Value
);
operation!(
    /// Frequently answers with `null` for accounts other than the caller's.
    GetAllSummonerDataByAccount, SUMMONER_SERVICE, "getAllSummonerDataByAccount", Value
);
operation!(GetSummonerNames, SUMMONER_SERVICE, "getSummonerNames", Vec<String>);
operation!(
    RetrievePlayerStatsByAccountId,
    PLAYER_STATS_SERVICE,
    "retrievePlayerStatsByAccountId",
    Value
);
operation!(GetAggregatedStats, PLAYER_STATS_SERVICE, "getAggregatedStats", Value);
operation!(
    /// The server faults for unknown ids; the client methods turn that into `None`.
    FindPlayer, SUMMONER_TEAM_SERVICE, "findPlayer", Option<Value>
);

// ---------------------------------------------------------------------------
// Named client methods
// ---------------------------------------------------------------------------

impl<C: Connector, A: TokenAcquirer> RpcClient<C, A> {
    pub fn get_summoner_by_name(&self, name: &str) -> Result<Option<PublicSummoner>, RpcError> {
        self.call::<GetSummonerByName>(vec![Value::from(name)])
    }

    pub fn get_summoner_by_name_async(
        &self,
        name: &str,
        handler: impl FnOnce(Result<Option<PublicSummoner>, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetSummonerByName, _>(vec![Value::from(name)], handler)
    }

    pub fn get_recent_games(&self, account_id: i64) -> Result<RecentGames, RpcError> {
        self.call::<GetRecentGames>(vec![Value::from(account_id)])
    }

    pub fn get_recent_games_async(
        &self,
        account_id: i64,
        handler: impl FnOnce(Result<RecentGames, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetRecentGames, _>(vec![Value::from(account_id)], handler)
    }

    pub fn get_all_public_summoner_data_by_account(
        &self,
        account_id: i64,
    ) -> Result<Value, RpcError> {
        self.call::<GetAllPublicSummonerDataByAccount>(vec![Value::from(account_id)])
    }

    pub fn get_all_public_summoner_data_by_account_async(
        &self,
        account_id: i64,
        handler: impl FnOnce(Result<Value, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetAllPublicSummonerDataByAccount, _>(
            vec![Value::from(account_id)],
            handler,
        )
    }

    pub fn get_all_summoner_data_by_account(&self, account_id: i64) -> Result<Value, RpcError> {
        self.call::<GetAllSummonerDataByAccount>(vec![Value::from(account_id)])
    }

    pub fn get_all_summoner_data_by_account_async(
        &self,
        account_id: i64,
        handler: impl FnOnce(Result<Value, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetAllSummonerDataByAccount, _>(vec![Value::from(account_id)], handler)
    }

    /// Names for the given summoner ids, in the same order.
    pub fn get_summoner_names(&self, summoner_ids: &[i64]) -> Result<Vec<String>, RpcError> {
        self.call::<GetSummonerNames>(vec![Value::from(summoner_ids.to_vec())])
    }

    pub fn get_summoner_names_async(
        &self,
        summoner_ids: &[i64],
        handler: impl FnOnce(Result<Vec<String>, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetSummonerNames, _>(vec![Value::from(summoner_ids.to_vec())], handler)
    }

    pub fn retrieve_player_stats_by_account_id(
        &self,
        account_id: i64,
        season: &str,
    ) -> Result<Value, RpcError> {
        self.call::<RetrievePlayerStatsByAccountId>(stats_args(account_id, season))
    }

    pub fn retrieve_player_stats_by_account_id_async(
        &self,
        account_id: i64,
        season: &str,
        handler: impl FnOnce(Result<Value, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<RetrievePlayerStatsByAccountId, _>(stats_args(account_id, season), handler)
    }

    pub fn get_aggregated_stats(
        &self,
        account_id: i64,
        game_mode: &str,
        season: &str,
    ) -> Result<Value, RpcError> {
        self.call::<GetAggregatedStats>(aggregated_args(account_id, game_mode, season))
    }

    pub fn get_aggregated_stats_async(
        &self,
        account_id: i64,
        game_mode: &str,
        season: &str,
        handler: impl FnOnce(Result<Value, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<GetAggregatedStats, _>(
            aggregated_args(account_id, game_mode, season),
            handler,
        )
    }

    /// Team-service record for a summoner. `None` when the id is unknown,
    /// which the server reports as a fault.
    pub fn find_player(&self, summoner_id: i64) -> Result<Option<Value>, RpcError> {
        invalid_id_as_none(self.call::<FindPlayer>(vec![Value::from(summoner_id)]))
    }

    pub fn find_player_async(
        &self,
        summoner_id: i64,
        handler: impl FnOnce(Result<Option<Value>, RpcError>) + Send + 'static,
    ) -> Result<(), RpcError> {
        self.call_async::<FindPlayer, _>(vec![Value::from(summoner_id)], move |result| {
            handler(invalid_id_as_none(result))
        })
    }
}

fn stats_args(account_id: i64, season: &str) -> Vec<Value> {
    vec![Value::from(account_id), Value::from(season)]
}

fn aggregated_args(account_id: i64, game_mode: &str, season: &str) -> Vec<Value> {
    vec![
        Value::from(account_id),
        Value::from(game_mode),
        Value::from(season),
    ]
}

fn invalid_id_as_none(result: Result<Option<Value>, RpcError>) -> Result<Option<Value>, RpcError> {
    match result {
        Err(RpcError::Fault(fault)) => {
            debug!(%fault, "findPlayer fault, treating the id as unknown");
            Ok(None)
        }
        other => other,
    }
}
