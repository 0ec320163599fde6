#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! [`MockInspectClient`] plays the registry contract in-process: it answers
//! every view function with BCS-encoded return values built from a scripted
//! set of cards, counts calls per function and per card, and can be told to
//! fail specific cards or functions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use card_reader_types::{ProfileCard, RetryConfig, Skill, SuiAddress, TtlPolicy};
use parking_lot::Mutex;
use sui_card_reader::{CardCaches, CardFetcher, CollectionOrchestrator, ReaderConfig};
use sui_transport::{CallArg, InspectClient, InspectResult, RawValue, ViewCall};
use sui_view_cache::{Clock, ManualClock};

pub const START_MS: u64 = 1_700_000_000_000;

/// Functions whose second argument is a card ID.
const PER_CARD: [&str; 7] = [
    "get_card_info",
    "get_card_skills",
    "get_card_reviews",
    "get_work_preferences",
    "get_social_links",
    "get_card_languages",
    "get_card_analytics",
];

pub fn address(n: u8) -> SuiAddress {
    SuiAddress::parse(&format!("0x{:x}", n)).unwrap()
}

/// A card as the contract stores it.
#[derive(Debug, Clone)]
pub struct ChainCard {
    pub owner: SuiAddress,
    pub name: String,
    pub title: String,
    pub location: String,
    pub skills: Vec<Skill>,
    pub languages: Vec<String>,
    pub projects: Vec<String>,
}

impl ChainCard {
    pub fn new(owner: u8, name: &str) -> Self {
        Self {
            owner: address(owner),
            name: name.to_string(),
            title: "Engineer".to_string(),
            location: "Lisbon".to_string(),
            skills: vec![Skill {
                name: "Move".to_string(),
                proficiency: 4,
                years: 2,
            }],
            languages: vec!["English".to_string()],
            projects: vec![r#"{"name":"Bridge","url":"https://bridge.example"}"#.to_string()],
        }
    }
}

#[derive(Default)]
struct State {
    cards: BTreeMap<u64, ChainCard>,
    count_override: Option<u64>,
    failing_cards: HashSet<u64>,
    blank_names: HashSet<u64>,
    failing_functions: HashSet<String>,
    searches: HashMap<(String, String), Vec<u64>>,
    admins: HashSet<SuiAddress>,
    calls: Vec<(String, Option<u64>)>,
    info_in_flight: usize,
    max_info_in_flight: usize,
}

#[derive(Default)]
pub struct MockInspectClient {
    state: Mutex<State>,
}

fn bcs_bytes<T: serde::Serialize + ?Sized>(value: &T) -> RawValue {
    RawValue::Bytes(bcs::to_bytes(value).unwrap())
}

impl MockInspectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cards `1..=n`, card `i` owned by `owner_of(i)`.
    pub fn with_cards(n: u64, owner_of: impl Fn(u64) -> u8) -> Self {
        let client = Self::new();
        for id in 1..=n {
            client.insert_card(id, ChainCard::new(owner_of(id), &format!("Card {}", id)));
        }
        client
    }

    pub fn insert_card(&self, id: u64, card: ChainCard) {
        self.state.lock().cards.insert(id, card);
    }

    pub fn remove_card(&self, id: u64) {
        self.state.lock().cards.remove(&id);
    }

    pub fn rename(&self, id: u64, name: &str) {
        if let Some(card) = self.state.lock().cards.get_mut(&id) {
            card.name = name.to_string();
        }
    }

    pub fn set_count(&self, count: u64) {
        self.state.lock().count_override = Some(count);
    }

    pub fn fail_card(&self, id: u64) {
        self.state.lock().failing_cards.insert(id);
    }

    pub fn heal_card(&self, id: u64) {
        self.state.lock().failing_cards.remove(&id);
    }

    /// `get_card_info` for `id` succeeds but carries an empty name.
    pub fn blank_name(&self, id: u64) {
        self.state.lock().blank_names.insert(id);
    }

    pub fn fail_function(&self, function: &str) {
        self.state.lock().failing_functions.insert(function.to_string());
    }

    pub fn heal_function(&self, function: &str) {
        self.state.lock().failing_functions.remove(function);
    }

    pub fn set_search(&self, function: &str, text: &str, ids: Vec<u64>) {
        self.state
            .lock()
            .searches
            .insert((function.to_string(), text.to_string()), ids);
    }

    pub fn add_admin(&self, address: SuiAddress) {
        self.state.lock().admins.insert(address);
    }

    pub fn calls(&self, function: &str) -> usize {
        self.state.lock().calls.iter().filter(|(f, _)| f == function).count()
    }

    pub fn card_calls(&self, function: &str, id: u64) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(f, card)| f == function && *card == Some(id))
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn max_info_in_flight(&self) -> usize {
        self.state.lock().max_info_in_flight
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.max_info_in_flight = 0;
    }

    fn respond(&self, function: &str, id: Option<u64>, call: &ViewCall) -> Result<InspectResult> {
        let state = self.state.lock();
        if state.failing_functions.contains(function) {
            return Err(anyhow!("injected failure for {}", function));
        }
        let card = id.and_then(|id| state.cards.get(&id));
        let values = match function {
            "get_total_cards" => {
                let total = state.count_override.unwrap_or(state.cards.len() as u64);
                vec![bcs_bytes(&total)]
            }
            "get_card_info" => {
                let id = id.ok_or_else(|| anyhow!("missing card id"))?;
                if state.failing_cards.contains(&id) {
                    return Err(anyhow!("connection reset while reading card {}", id));
                }
                let Some(card) = card else {
                    return Ok(InspectResult::default());
                };
                let name = if state.blank_names.contains(&id) { "" } else { card.name.as_str() };
                vec![
                    RawValue::Bytes(card.owner.to_bytes().to_vec()),
                    bcs_bytes(name),
                    bcs_bytes(card.title.as_str()),
                    bcs_bytes("defi"),
                    bcs_bytes("https://img.example/a.png"),
                    bcs_bytes("Builds things"),
                    bcs_bytes(&5u64),
                    RawValue::Bytes(vec![1]),
                    bcs_bytes(&card.projects),
                    bcs_bytes(&(START_MS - 1_000)),
                    bcs_bytes(&(START_MS - 500)),
                    bcs_bytes(card.location.as_str()),
                ]
            }
            "get_card_skills" => {
                let skills: Vec<String> = card
                    .map(|c| c.skills.iter().map(|s| serde_json::to_string(s).unwrap()).collect())
                    .unwrap_or_default();
                vec![bcs_bytes(&skills)]
            }
            "get_card_reviews" => vec![bcs_bytes(&Vec::<String>::new())],
            "get_work_preferences" => vec![
                bcs_bytes(&vec!["remote".to_string()]),
                bcs_bytes(&Some(90u64)),
                bcs_bytes("EU"),
                bcs_bytes("Now"),
            ],
            "get_social_links" => vec![
                bcs_bytes(&None::<String>),
                bcs_bytes(&None::<String>),
                bcs_bytes(&Some("octocat".to_string())),
                bcs_bytes(&Some("https://example.dev".to_string())),
            ],
            "get_card_languages" => {
                vec![bcs_bytes(&card.map(|c| c.languages.clone()).unwrap_or_default())]
            }
            "get_card_analytics" => {
                let views = id.unwrap_or(0) * 10;
                vec![bcs_bytes(&views), bcs_bytes(&1u64), bcs_bytes(&2u64), bcs_bytes(&START_MS)]
            }
            "search_by_skill" | "search_by_location" | "search_by_work_type" | "search_by_niche" => {
                let text = match call.args.get(1) {
                    Some(CallArg::Pure(bytes)) => bcs::from_bytes::<String>(bytes)?,
                    _ => return Err(anyhow!("missing search text")),
                };
                let ids = state
                    .searches
                    .get(&(function.to_string(), text))
                    .cloned()
                    .unwrap_or_default();
                vec![bcs_bytes(&ids)]
            }
            "is_admin" => {
                let who = match call.args.get(1) {
                    Some(CallArg::Pure(bytes)) => SuiAddress::from_bytes(bytes),
                    _ => None,
                };
                let flag = who.is_some_and(|a| state.admins.contains(&a));
                vec![RawValue::Bytes(vec![u8::from(flag)])]
            }
            "get_platform_stats" => {
                let total = state.cards.len() as u64;
                vec![bcs_bytes(&total), bcs_bytes(&total), bcs_bytes(&1_000_000u64)]
            }
            other => return Err(anyhow!("unknown view function {}", other)),
        };
        Ok(InspectResult::from_values(values))
    }
}

#[async_trait]
impl InspectClient for MockInspectClient {
    async fn inspect(&self, call: &ViewCall) -> Result<InspectResult> {
        let function = call.target.function.clone();
        let id = if PER_CARD.contains(&function.as_str()) {
            match call.args.get(1) {
                Some(CallArg::Pure(bytes)) => bcs::from_bytes::<u64>(bytes).ok(),
                _ => None,
            }
        } else {
            None
        };
        let is_info = function == "get_card_info";
        {
            let mut state = self.state.lock();
            state.calls.push((function.clone(), id));
            if is_info {
                state.info_in_flight += 1;
                state.max_info_in_flight = state.max_info_in_flight.max(state.info_in_flight);
            }
        }
        // Let sibling fetches in the same chunk start before this one answers.
        tokio::task::yield_now().await;
        let result = self.respond(&function, id, call);
        if is_info {
            self.state.lock().info_in_flight -= 1;
        }
        result
    }
}

pub fn config() -> ReaderConfig {
    ReaderConfig::new("http://127.0.0.1:9000", address(0xaa), address(0xbb), 1)
        .with_retry(RetryConfig::none())
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(START_MS))
}

pub fn caches(clock: &Arc<ManualClock>) -> Arc<CardCaches> {
    let clock: Arc<dyn Clock> = clock.clone();
    Arc::new(CardCaches::new(clock, TtlPolicy::default()))
}

pub fn reader(client: MockInspectClient, clock: &Arc<ManualClock>) -> CollectionOrchestrator<MockInspectClient> {
    reader_with(client, config(), caches(clock))
}

pub fn reader_with(
    client: MockInspectClient,
    config: ReaderConfig,
    caches: Arc<CardCaches>,
) -> CollectionOrchestrator<MockInspectClient> {
    CollectionOrchestrator::new(CardFetcher::new(client, config, caches))
}

pub fn ids(cards: &[ProfileCard]) -> Vec<u64> {
    cards.iter().map(|c| c.id).collect()
}
