//! Application state management for Stockdeck.
//!
//! This module contains the core `App` struct that manages all application
//! state: UI state, the session lifecycle, fetched data, and background task
//! coordination.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, AuthEvent, MarketClient};
use crate::auth::CredentialStore;
use crate::config::Config;
use crate::models::{
    sort_watchlist, AggBar, HistoryRange, MarketStatus, NewWatchlistItem, NewsArticle, PrevClose,
    TickerDetails, TickerMatch, WatchlistItem, WatchlistResponse, WatchlistSort, WatchlistUpdate,
};
use crate::portfolio::PerformanceSort;
use crate::session::{ExpiryAction, ExpiryNotifier, SessionStore};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// 32 covers a full watchlist refresh (one result per symbol) with headroom.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Maximum concurrent quote requests during a watchlist refresh.
/// Limits parallel requests to avoid hitting the backend's rate limits.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Minimum seconds between ticker searches.
const SEARCH_COOLDOWN_SECS: u64 = 30;

/// Minimum seconds between history range changes.
const RANGE_COOLDOWN_SECS: u64 = 20;

/// How long a fetched market status stays fresh before it is re-polled.
const MARKET_STATUS_TTL_SECS: u64 = 60;

/// How long the first-visit welcome banner stays on screen.
const WELCOME_SECS: u64 = 15;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Watchlist,
    Search,
    Performance,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Watchlist => "Watchlist",
            Tab::Search => "Search",
            Tab::Performance => "Performance",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Watchlist => Tab::Search,
            Tab::Search => Tab::Performance,
            Tab::Performance => Tab::Watchlist,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Watchlist => Tab::Performance,
            Tab::Search => Tab::Watchlist,
            Tab::Performance => Tab::Search,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    LoggingIn,
    Registering,
    Searching,
    AddingManual,
    EditingItem,
    ConfirmingRemove,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Registration form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterFocus {
    Email,
    Password,
    Confirm,
    Button,
}

/// Manual-add form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualAddFocus {
    Symbol,
    Quantity,
    Price,
    Date,
    Industry,
    Button,
}

impl ManualAddFocus {
    pub fn next(&self) -> Self {
        match self {
            Self::Symbol => Self::Quantity,
            Self::Quantity => Self::Price,
            Self::Price => Self::Date,
            Self::Date => Self::Industry,
            Self::Industry => Self::Button,
            Self::Button => Self::Symbol,
        }
    }
}

/// Edit form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditFocus {
    Quantity,
    Price,
    Date,
    Button,
}

impl EditFocus {
    pub fn next(&self) -> Self {
        match self {
            Self::Quantity => Self::Price,
            Self::Price => Self::Date,
            Self::Date => Self::Button,
            Self::Button => Self::Quantity,
        }
    }
}

// ============================================================================
// Cooldowns
// ============================================================================

/// A simple rate limit on a user-triggered action.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cooldown {
    until: Option<Instant>,
}

impl Cooldown {
    pub fn ready(&self, now: Instant) -> bool {
        match self.until {
            Some(until) => now >= until,
            None => true,
        }
    }

    pub fn start(&mut self, now: Instant, secs: u64) {
        self.until = Some(now + Duration::from_secs(secs));
    }

    /// Whole seconds until the action is allowed again.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        match self.until {
            Some(until) if until > now => (until - now).as_secs() + 1,
            _ => 0,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Result types from background fetch tasks.
///
/// These variants are sent through an MPSC channel from spawned tasks back
/// to the main application, which drains them once per event loop pass.
enum FetchResult {
    /// The watchlist with its backend-computed invested total
    Watchlist(WatchlistResponse),
    /// Latest price for one symbol (symbol, price)
    LatestPrice(String, f64),
    /// Ticker search results
    SearchResults(Vec<TickerMatch>),
    /// Reference details, previous close, and news for a selected ticker
    StockDetail {
        symbol: String,
        details: Option<TickerDetails>,
        prev_close: Option<PrevClose>,
        news: Vec<NewsArticle>,
    },
    /// Aggregate bars for a chart range (symbol, range, bars)
    History(String, HistoryRange, Vec<AggBar>),
    /// Current market open/closed state
    MarketStatus(MarketStatus),
    /// A watchlist mutation succeeded; the list should be refetched
    WatchlistChanged(&'static str),
    /// The session was extended from the expiry prompt
    SessionRefreshed,
    /// An error occurred in a background task
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub session: SessionStore,
    pub api: ApiClient,
    pub market: Option<MarketClient>,
    pub expiry: ExpiryNotifier,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub watchlist_sort: WatchlistSort,
    pub watchlist_sort_ascending: bool,
    pub performance_sort: PerformanceSort,
    pub performance_sort_ascending: bool,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Registration form state
    pub register_email: String,
    pub register_password: String,
    pub register_confirm: String,
    pub register_focus: RegisterFocus,
    pub register_error: Option<String>,

    // Manual-add form state
    pub manual_symbol: String,
    pub manual_quantity: String,
    pub manual_price: String,
    pub manual_date: String,
    pub manual_industry: String,
    pub manual_focus: ManualAddFocus,
    pub manual_error: Option<String>,

    // Edit form state
    pub editing_item_id: Option<i64>,
    pub edit_quantity: String,
    pub edit_price: String,
    pub edit_date: String,
    pub edit_focus: EditFocus,
    pub edit_error: Option<String>,

    // Selection indices
    pub watchlist_selection: usize,
    pub search_selection: usize,
    pub performance_selection: usize,
    pub news_selection: usize,

    // Watchlist data
    pub watchlist: Vec<WatchlistItem>,
    pub watchlist_total: f64,
    pub latest_prices: HashMap<String, f64>,

    // Search tab data
    pub search_input: String,
    pub search_results: Vec<TickerMatch>,
    pub selected_symbol: Option<String>,
    pub ticker_details: Option<TickerDetails>,
    pub prev_close: Option<PrevClose>,
    pub news: Vec<NewsArticle>,
    pub history: Vec<AggBar>,
    pub history_range: HistoryRange,
    pub search_quantity: String,

    // Rate limits and timed state
    pub search_cooldown: Cooldown,
    pub range_cooldown: Cooldown,
    pub market_status: Option<MarketStatus>,
    market_status_fetched_at: Option<Instant>,
    market_status_inflight: bool,
    pub welcome_deadline: Option<Instant>,

    // Background task channels
    fetch_rx: mpsc::Receiver<FetchResult>,
    fetch_tx: mpsc::Sender<FetchResult>,
    auth_rx: mpsc::UnboundedReceiver<AuthEvent>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let session = SessionStore::new();
        let (auth_tx, auth_rx) = mpsc::unbounded_channel();
        let api = ApiClient::new(config.backend_url(), session.clone(), auth_tx)?;

        let market = match config.market_api_key() {
            Some(key) => Some(MarketClient::new(key)?),
            None => {
                warn!("No market API key configured; search tab disabled");
                None
            }
        };

        let (fetch_tx, fetch_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let login_email = std::env::var("STOCKDECK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();

        // Env var wins; otherwise pull the stored password for the last
        // account from the OS keychain.
        let login_password = std::env::var("STOCKDECK_PASSWORD")
            .ok()
            .or_else(|| {
                if !login_email.is_empty() && CredentialStore::has_credentials(&login_email) {
                    CredentialStore::get_password(&login_email).ok()
                } else {
                    None
                }
            })
            .unwrap_or_default();

        Ok(Self {
            config,
            session,
            api,
            market,
            expiry: ExpiryNotifier::new(),

            state: AppState::LoggingIn,
            current_tab: Tab::Watchlist,
            watchlist_sort: WatchlistSort::default(),
            watchlist_sort_ascending: true,
            performance_sort: PerformanceSort::default(),
            performance_sort_ascending: true,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            register_email: String::new(),
            register_password: String::new(),
            register_confirm: String::new(),
            register_focus: RegisterFocus::Email,
            register_error: None,

            manual_symbol: String::new(),
            manual_quantity: String::new(),
            manual_price: String::new(),
            manual_date: String::new(),
            manual_industry: String::new(),
            manual_focus: ManualAddFocus::Symbol,
            manual_error: None,

            editing_item_id: None,
            edit_quantity: String::new(),
            edit_price: String::new(),
            edit_date: String::new(),
            edit_focus: EditFocus::Quantity,
            edit_error: None,

            watchlist_selection: 0,
            search_selection: 0,
            performance_selection: 0,
            news_selection: 0,

            watchlist: Vec::new(),
            watchlist_total: 0.0,
            latest_prices: HashMap::new(),

            search_input: String::new(),
            search_results: Vec::new(),
            selected_symbol: None,
            ticker_details: None,
            prev_close: None,
            news: Vec::new(),
            history: Vec::new(),
            history_range: HistoryRange::default(),
            search_quantity: "1".to_string(),

            search_cooldown: Cooldown::default(),
            range_cooldown: Cooldown::default(),
            market_status: None,
            market_status_fetched_at: None,
            market_status_inflight: false,
            welcome_deadline: None,

            fetch_rx,
            fetch_tx,
            auth_rx,

            status_message: None,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Switch from the login overlay to the registration overlay
    pub fn start_register(&mut self) {
        self.state = AppState::Registering;
        self.register_email = self.login_email.clone();
        self.register_password.clear();
        self.register_confirm.clear();
        self.register_focus = if self.register_email.is_empty() {
            RegisterFocus::Email
        } else {
            RegisterFocus::Password
        };
        self.register_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        match self.api.login(&email, &password).await {
            Ok(response) => {
                if let Err(e) = CredentialStore::store(&email, &password) {
                    warn!(error = %e, "Failed to store credentials");
                }

                self.session.set(
                    response.user,
                    response.access_token,
                    response.refresh_token,
                );

                self.config.last_email = Some(email);
                let first_visit = !self.config.has_visited;
                self.config.has_visited = true;
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }

                self.login_password.clear();
                self.state = AppState::Normal;
                self.expiry.arm(Instant::now());
                if first_visit {
                    self.welcome_deadline =
                        Some(Instant::now() + Duration::from_secs(WELCOME_SECS));
                }

                info!("Login successful");
                self.refresh_watchlist_background();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                let user_message = match &e {
                    crate::api::ApiError::Unauthorized | crate::api::ApiError::Forbidden => {
                        // The stored password is stale; drop it so the next
                        // start does not prefill a rejected credential.
                        if CredentialStore::has_credentials(&email) {
                            if let Err(e) = CredentialStore::delete(&email) {
                                warn!(error = %e, "Failed to clear stored credentials");
                            }
                        }
                        "Invalid email or password".to_string()
                    }
                    crate::api::ApiError::NetworkError(inner) if inner.is_timeout() => {
                        "Connection timed out. Please try again.".to_string()
                    }
                    crate::api::ApiError::NetworkError(_) => {
                        "Unable to connect to server. Check your internet connection.".to_string()
                    }
                    other => format!("Login failed: {}", other),
                };
                self.login_error = Some(user_message);
                Err(e.into())
            }
        }
    }

    /// Attempt registration with the values from the registration form.
    /// On success the user lands back on the login overlay with the email
    /// prefilled.
    pub async fn attempt_register(&mut self) -> Result<()> {
        let email = self.register_email.trim().to_string();
        let password = self.register_password.clone();

        if email.is_empty() || password.is_empty() {
            self.register_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }
        if password != self.register_confirm {
            self.register_error = Some("Passwords do not match".to_string());
            return Err(anyhow::anyhow!("Passwords do not match"));
        }

        self.register_error = None;

        match self.api.register(&email, &password).await {
            Ok(()) => {
                info!("Registration successful");
                self.login_email = email;
                self.login_password.clear();
                self.start_login();
                self.status_message = Some("Account created. Please log in.".to_string());
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                self.register_error = Some(format!("Registration failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Drop the session and return to the login overlay.
    pub fn logout(&mut self) {
        info!("Logging out");
        self.session.clear();
        self.expiry.disarm();
        self.welcome_deadline = None;
        self.watchlist.clear();
        self.watchlist_total = 0.0;
        self.latest_prices.clear();
        self.start_login();
    }

    // =========================================================================
    // Time-driven state
    // =========================================================================

    /// Advance timers. Called once per event loop pass.
    pub fn tick(&mut self, now: Instant) {
        if let Some(action) = self.expiry.tick(now) {
            match action {
                ExpiryAction::Refresh => self.extend_session_background(),
                ExpiryAction::Terminate => {
                    info!("Session prompt expired without response");
                    self.logout();
                    self.login_error =
                        Some("Session expired. Please log in again.".to_string());
                }
            }
        }

        if let Some(deadline) = self.welcome_deadline {
            if now >= deadline {
                self.welcome_deadline = None;
            }
        }

        self.maybe_poll_market_status(now);
    }

    /// Seconds left on the welcome banner, if it is showing.
    pub fn welcome_secs_left(&self, now: Instant) -> Option<u64> {
        self.welcome_deadline
            .filter(|deadline| *deadline > now)
            .map(|deadline| (deadline - now).as_secs() + 1)
    }

    /// The user confirmed the expiry prompt: extend the session.
    pub fn confirm_session_prompt(&mut self) {
        if let Some(ExpiryAction::Refresh) = self.expiry.confirm() {
            self.extend_session_background();
        }
    }

    /// The user declined the expiry prompt: log out now.
    pub fn decline_session_prompt(&mut self) {
        if let Some(ExpiryAction::Terminate) = self.expiry.decline() {
            self.logout();
            self.status_message = Some("Logged out.".to_string());
        }
    }

    fn extend_session_background(&mut self) {
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        self.status_message = Some("Extending session...".to_string());
        tokio::spawn(async move {
            match api.refresh_session().await {
                Ok(()) => Self::send_result(&tx, FetchResult::SessionRefreshed).await,
                Err(e) => {
                    // The client already cleared the session; the auth event
                    // channel brings the UI back to the login overlay.
                    error!(error = %e, "Session extension failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Session: {}", e))).await;
                }
            }
        });
    }

    fn maybe_poll_market_status(&mut self, now: Instant) {
        let Some(market) = self.market.clone() else {
            return;
        };
        if self.market_status_inflight {
            return;
        }
        let fresh = self
            .market_status_fetched_at
            .map(|at| now.duration_since(at).as_secs() < MARKET_STATUS_TTL_SECS)
            .unwrap_or(false);
        if fresh {
            return;
        }

        self.market_status_inflight = true;
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match market.market_status().await {
                Ok(status) => Self::send_result(&tx, FetchResult::MarketStatus(status)).await,
                Err(e) => {
                    debug!(error = %e, "Market status fetch failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Market: {}", e))).await;
                }
            }
        });
    }

    // =========================================================================
    // Watchlist operations
    // =========================================================================

    /// Spawn a background task that refetches the watchlist and then the
    /// latest price for each distinct symbol.
    pub fn refresh_watchlist_background(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        info!("Starting background watchlist refresh");
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();

        tokio::spawn(async move {
            let response = match api.watchlist().await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "Watchlist fetch failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Watchlist: {}", e))).await;
                    return;
                }
            };

            let symbols = crate::portfolio::unique_symbols(&response.watchlist);
            Self::send_result(&tx, FetchResult::Watchlist(response)).await;

            let tx_prices = tx.clone();
            stream::iter(symbols)
                .map(|symbol| {
                    let api = api.clone();
                    async move {
                        let price = api.last_price(&symbol).await;
                        (symbol, price)
                    }
                })
                .buffer_unordered(MAX_CONCURRENT_REQUESTS)
                .for_each(|(symbol, price)| {
                    let tx = tx_prices.clone();
                    async move {
                        match price {
                            Ok(price) => {
                                Self::send_result(&tx, FetchResult::LatestPrice(symbol, price))
                                    .await;
                            }
                            Err(e) => {
                                debug!(%symbol, error = %e, "Quote fetch failed");
                            }
                        }
                    }
                })
                .await;

            debug!("Watchlist refresh complete");
        });
    }

    /// Open the manual-add overlay with a blank form.
    pub fn start_manual_add(&mut self) {
        self.state = AppState::AddingManual;
        self.manual_symbol.clear();
        self.manual_quantity.clear();
        self.manual_price.clear();
        self.manual_date = chrono::Utc::now().date_naive().to_string();
        self.manual_industry.clear();
        self.manual_focus = ManualAddFocus::Symbol;
        self.manual_error = None;
    }

    /// Validate the manual-add form and submit it in the background.
    pub fn submit_manual_add(&mut self) {
        let symbol = self.manual_symbol.trim().to_string();
        if symbol.is_empty() {
            self.manual_error = Some("Symbol required".to_string());
            return;
        }
        let Ok(quantity) = self.manual_quantity.trim().parse::<f64>() else {
            self.manual_error = Some("Invalid quantity".to_string());
            return;
        };
        let Ok(price) = self.manual_price.trim().parse::<f64>() else {
            self.manual_error = Some("Invalid price".to_string());
            return;
        };
        if quantity <= 0.0 || price < 0.0 {
            self.manual_error = Some("Quantity and price must be positive".to_string());
            return;
        }
        let date = self.manual_date.trim().to_string();
        let industry = match self.manual_industry.trim() {
            "" => None,
            s => Some(s.to_string()),
        };

        let item = NewWatchlistItem::manual(symbol, quantity, price, date, industry);
        self.state = AppState::Normal;
        self.status_message = Some("Adding position...".to_string());
        self.mutate_watchlist(move |api| async move {
            api.add_watchlist_item(&item).await?;
            Ok("Position added")
        });
    }

    /// Open the edit overlay prefilled from the selected watchlist item.
    pub fn start_edit_selected(&mut self) {
        let Some(item) = self.watchlist.get(self.watchlist_selection) else {
            return;
        };
        self.editing_item_id = Some(item.id);
        self.edit_quantity = item.quantity.to_string();
        self.edit_price = item.price_at_time.to_string();
        self.edit_date = item.added_date().to_string();
        self.edit_focus = EditFocus::Quantity;
        self.edit_error = None;
        self.state = AppState::EditingItem;
    }

    /// Validate the edit form and submit it in the background.
    pub fn submit_edit(&mut self) {
        let Some(id) = self.editing_item_id else {
            self.state = AppState::Normal;
            return;
        };
        let Ok(quantity) = self.edit_quantity.trim().parse::<f64>() else {
            self.edit_error = Some("Invalid quantity".to_string());
            return;
        };
        let Ok(price) = self.edit_price.trim().parse::<f64>() else {
            self.edit_error = Some("Invalid price".to_string());
            return;
        };
        let update = WatchlistUpdate {
            quantity,
            price_at_time: price,
            added_at: match self.edit_date.trim() {
                "" => None,
                s => Some(s.to_string()),
            },
        };

        self.editing_item_id = None;
        self.state = AppState::Normal;
        self.status_message = Some("Saving changes...".to_string());
        self.mutate_watchlist(move |api| async move {
            api.update_watchlist_item(id, &update).await?;
            Ok("Position updated")
        });
    }

    /// Remove the selected watchlist item, after the confirm overlay.
    pub fn remove_selected(&mut self) {
        let Some(item) = self.watchlist.get(self.watchlist_selection) else {
            self.state = AppState::Normal;
            return;
        };
        let id = item.id;
        self.state = AppState::Normal;
        self.status_message = Some("Removing position...".to_string());
        self.mutate_watchlist(move |api| async move {
            api.remove_watchlist_item(id).await?;
            Ok("Position removed")
        });
    }

    /// Run a watchlist mutation in the background and signal a refetch on
    /// success.
    fn mutate_watchlist<F, Fut>(&mut self, op: F)
    where
        F: FnOnce(ApiClient) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<&'static str, crate::api::ApiError>>
            + Send
            + 'static,
    {
        let api = self.api.clone();
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match op(api).await {
                Ok(message) => {
                    Self::send_result(&tx, FetchResult::WatchlistChanged(message)).await;
                }
                Err(e) => {
                    error!(error = %e, "Watchlist mutation failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Watchlist: {}", e))).await;
                }
            }
        });
    }

    /// Cycle the watchlist sort column, or flip direction when the column
    /// repeats.
    pub fn cycle_watchlist_sort(&mut self) {
        self.watchlist_sort = self.watchlist_sort.next();
        self.apply_watchlist_sort();
    }

    pub fn toggle_watchlist_direction(&mut self) {
        self.watchlist_sort_ascending = !self.watchlist_sort_ascending;
        self.apply_watchlist_sort();
    }

    fn apply_watchlist_sort(&mut self) {
        sort_watchlist(
            &mut self.watchlist,
            self.watchlist_sort,
            self.watchlist_sort_ascending,
        );
        self.watchlist_selection = clamp_selection(self.watchlist_selection, self.watchlist.len());
    }

    pub fn cycle_performance_sort(&mut self) {
        self.performance_sort = self.performance_sort.next();
    }

    pub fn toggle_performance_direction(&mut self) {
        self.performance_sort_ascending = !self.performance_sort_ascending;
    }

    // =========================================================================
    // Search tab operations
    // =========================================================================

    /// Run a ticker search, subject to the search cooldown.
    pub fn trigger_search(&mut self, now: Instant) {
        let query = self.search_input.trim().to_string();
        if query.is_empty() {
            return;
        }
        let Some(market) = self.market.clone() else {
            self.status_message = Some("No market API key configured".to_string());
            return;
        };
        if !self.search_cooldown.ready(now) {
            self.status_message = Some(format!(
                "Search available in {}s",
                self.search_cooldown.remaining_secs(now)
            ));
            return;
        }

        self.search_cooldown.start(now, SEARCH_COOLDOWN_SECS);
        self.status_message = Some(format!("Searching for {}...", query));
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match market.search_tickers(&query).await {
                Ok(results) => Self::send_result(&tx, FetchResult::SearchResults(results)).await,
                Err(e) => {
                    error!(error = %e, "Ticker search failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Search: {}", e))).await;
                }
            }
        });
    }

    /// Load details, previous close, and news for the selected search result,
    /// plus the chart for the current range.
    pub fn select_search_result(&mut self, now: Instant) {
        let Some(result) = self.search_results.get(self.search_selection) else {
            return;
        };
        let symbol = result.ticker.clone();
        self.selected_symbol = Some(symbol.clone());
        self.ticker_details = None;
        self.prev_close = None;
        self.news.clear();
        self.history.clear();
        self.news_selection = 0;

        let Some(market) = self.market.clone() else {
            return;
        };
        let tx = self.fetch_tx.clone();
        let range = self.history_range;
        tokio::spawn(async move {
            let (details, prev_close, news, history) = tokio::join!(
                market.ticker_details(&symbol),
                market.previous_close(&symbol),
                market.news(&symbol),
                market.aggregates(&symbol, range),
            );

            Self::send_result(
                &tx,
                FetchResult::StockDetail {
                    symbol: symbol.clone(),
                    details: details.ok(),
                    prev_close: prev_close.ok().flatten(),
                    news: news.unwrap_or_default(),
                },
            )
            .await;

            match history {
                Ok(bars) => {
                    Self::send_result(&tx, FetchResult::History(symbol, range, bars)).await;
                }
                Err(e) => {
                    debug!(error = %e, "History fetch failed");
                }
            }
        });

        // The initial chart fetch counts against the range cooldown.
        self.range_cooldown.start(now, RANGE_COOLDOWN_SECS);
    }

    /// Move the chart to an adjacent range, subject to the range cooldown.
    pub fn change_history_range(&mut self, now: Instant, forward: bool) {
        let Some(symbol) = self.selected_symbol.clone() else {
            return;
        };
        let Some(market) = self.market.clone() else {
            return;
        };
        if !self.range_cooldown.ready(now) {
            self.status_message = Some(format!(
                "Range change available in {}s",
                self.range_cooldown.remaining_secs(now)
            ));
            return;
        }

        self.history_range = if forward {
            self.history_range.next()
        } else {
            self.history_range.prev()
        };
        self.range_cooldown.start(now, RANGE_COOLDOWN_SECS);

        let range = self.history_range;
        let tx = self.fetch_tx.clone();
        tokio::spawn(async move {
            match market.aggregates(&symbol, range).await {
                Ok(bars) => {
                    Self::send_result(&tx, FetchResult::History(symbol, range, bars)).await;
                }
                Err(e) => {
                    error!(error = %e, "History fetch failed");
                    Self::send_result(&tx, FetchResult::Error(format!("Chart: {}", e))).await;
                }
            }
        });
    }

    /// Add the selected search symbol to the watchlist with the entered
    /// quantity. The backend records the purchase price from its own quote.
    pub fn add_selected_to_watchlist(&mut self) {
        let Some(symbol) = self.selected_symbol.clone() else {
            return;
        };
        let Ok(quantity) = self.search_quantity.trim().parse::<f64>() else {
            self.status_message = Some("Invalid quantity".to_string());
            return;
        };
        if quantity <= 0.0 {
            self.status_message = Some("Quantity must be positive".to_string());
            return;
        }

        let item = NewWatchlistItem::from_quote(symbol.clone(), quantity);
        self.status_message = Some(format!("Adding {} to watchlist...", symbol));
        self.mutate_watchlist(move |api| async move {
            api.add_watchlist_item(&item).await?;
            Ok("Added to watchlist")
        });
    }

    // =========================================================================
    // Background Task Results
    // =========================================================================

    /// Helper to send fetch results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<FetchResult>, result: FetchResult) {
        if tx.send(result).await.is_err() {
            error!("Failed to send fetch result - channel closed");
        }
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        while let Ok(event) = self.auth_rx.try_recv() {
            match event {
                AuthEvent::SessionExpired => {
                    warn!("Session expired; returning to login");
                    self.logout();
                    self.login_error =
                        Some("Session expired. Please log in again.".to_string());
                }
            }
        }

        let mut results = Vec::new();
        while let Ok(result) = self.fetch_rx.try_recv() {
            results.push(result);
        }

        let mut refetch = false;
        for result in results {
            refetch |= self.process_fetch_result(result);
        }
        if refetch {
            self.refresh_watchlist_background();
        }
    }

    /// Process a single result from a background task. Returns true when the
    /// watchlist should be refetched.
    fn process_fetch_result(&mut self, result: FetchResult) -> bool {
        match result {
            FetchResult::Watchlist(response) => {
                self.watchlist = response.watchlist;
                self.watchlist_total = response.total;
                self.apply_watchlist_sort();
                self.clear_progress_message();
            }
            FetchResult::LatestPrice(symbol, price) => {
                self.latest_prices.insert(symbol, price);
            }
            FetchResult::SearchResults(results) => {
                self.search_selection = 0;
                self.search_results = results;
                if self.search_results.is_empty() {
                    self.status_message = Some("No tickers found".to_string());
                } else {
                    self.clear_progress_message();
                }
            }
            FetchResult::StockDetail {
                symbol,
                details,
                prev_close,
                news,
            } => {
                // A stale response for a previously selected symbol is dropped.
                if self.selected_symbol.as_deref() == Some(symbol.as_str()) {
                    self.ticker_details = details;
                    self.prev_close = prev_close;
                    self.news = news;
                    self.news_selection = 0;
                }
            }
            FetchResult::History(symbol, range, bars) => {
                if self.selected_symbol.as_deref() == Some(symbol.as_str())
                    && self.history_range == range
                {
                    self.history = bars;
                }
            }
            FetchResult::MarketStatus(status) => {
                self.market_status_inflight = false;
                self.market_status_fetched_at = Some(Instant::now());
                self.market_status = Some(status);
            }
            FetchResult::WatchlistChanged(message) => {
                self.status_message = Some(message.to_string());
                return true;
            }
            FetchResult::SessionRefreshed => {
                info!("Session extended");
                self.expiry.arm(Instant::now());
                self.status_message = Some("Session extended.".to_string());
            }
            FetchResult::Error(msg) => {
                error!(error = %msg, "Background task error");
                self.market_status_inflight = false;
                self.status_message = Some(format!("Error: {}", msg));
            }
        }
        false
    }

    fn clear_progress_message(&mut self) {
        if let Some(ref msg) = self.status_message {
            if !msg.starts_with("Error:") {
                self.status_message = None;
            }
        }
    }

    // =========================================================================
    // Input helpers
    // =========================================================================

    pub fn push_login_char(&mut self, c: char) {
        match self.login_focus {
            LoginFocus::Email if self.login_email.len() < MAX_EMAIL_LENGTH => {
                self.login_email.push(c)
            }
            LoginFocus::Password if self.login_password.len() < MAX_PASSWORD_LENGTH => {
                self.login_password.push(c)
            }
            _ => {}
        }
    }

    pub fn pop_login_char(&mut self) {
        match self.login_focus {
            LoginFocus::Email => {
                self.login_email.pop();
            }
            LoginFocus::Password => {
                self.login_password.pop();
            }
            LoginFocus::Button => {}
        }
    }

    pub fn push_register_char(&mut self, c: char) {
        match self.register_focus {
            RegisterFocus::Email if self.register_email.len() < MAX_EMAIL_LENGTH => {
                self.register_email.push(c)
            }
            RegisterFocus::Password if self.register_password.len() < MAX_PASSWORD_LENGTH => {
                self.register_password.push(c)
            }
            RegisterFocus::Confirm if self.register_confirm.len() < MAX_PASSWORD_LENGTH => {
                self.register_confirm.push(c)
            }
            _ => {}
        }
    }

    pub fn pop_register_char(&mut self) {
        match self.register_focus {
            RegisterFocus::Email => {
                self.register_email.pop();
            }
            RegisterFocus::Password => {
                self.register_password.pop();
            }
            RegisterFocus::Confirm => {
                self.register_confirm.pop();
            }
            RegisterFocus::Button => {}
        }
    }

    /// Move the active tab's selection by a signed amount, clamped to the
    /// list bounds.
    pub fn move_selection(&mut self, delta: isize) {
        match self.current_tab {
            Tab::Watchlist => {
                self.watchlist_selection =
                    step_selection(self.watchlist_selection, delta, self.watchlist.len());
            }
            Tab::Search => {
                if self.selected_symbol.is_some() {
                    self.news_selection =
                        step_selection(self.news_selection, delta, self.news.len());
                } else {
                    self.search_selection =
                        step_selection(self.search_selection, delta, self.search_results.len());
                }
            }
            Tab::Performance => {
                self.performance_selection =
                    step_selection(self.performance_selection, delta, self.watchlist.len());
            }
        }
    }

    pub fn selected_watchlist_item(&self) -> Option<&WatchlistItem> {
        self.watchlist.get(self.watchlist_selection)
    }
}

/// Clamp a selection index to a list of the given length.
fn clamp_selection(selection: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        selection.min(len - 1)
    }
}

/// Step a selection index by a signed amount, staying within bounds.
fn step_selection(selection: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = selection as isize + delta;
    next.clamp(0, len as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_cycle_wraps() {
        assert_eq!(Tab::Watchlist.next(), Tab::Search);
        assert_eq!(Tab::Performance.next(), Tab::Watchlist);
        assert_eq!(Tab::Watchlist.prev(), Tab::Performance);
    }

    #[test]
    fn test_cooldown_lifecycle() {
        let start = Instant::now();
        let mut cooldown = Cooldown::default();
        assert!(cooldown.ready(start));
        assert_eq!(cooldown.remaining_secs(start), 0);

        cooldown.start(start, 30);
        assert!(!cooldown.ready(start));
        assert!(cooldown.remaining_secs(start) >= 29);
        assert!(!cooldown.ready(start + Duration::from_secs(29)));
        assert!(cooldown.ready(start + Duration::from_secs(30)));
        assert_eq!(cooldown.remaining_secs(start + Duration::from_secs(31)), 0);
    }

    #[test]
    fn test_step_selection_clamps_at_bounds() {
        assert_eq!(step_selection(0, -1, 5), 0);
        assert_eq!(step_selection(4, 1, 5), 4);
        assert_eq!(step_selection(2, -10, 5), 0);
        assert_eq!(step_selection(2, 10, 5), 4);
        assert_eq!(step_selection(3, 1, 0), 0);
    }

    #[test]
    fn test_clamp_selection_after_removal() {
        assert_eq!(clamp_selection(4, 3), 2);
        assert_eq!(clamp_selection(1, 3), 1);
        assert_eq!(clamp_selection(0, 0), 0);
    }

    #[test]
    fn test_manual_add_focus_cycle() {
        let mut focus = ManualAddFocus::Symbol;
        for _ in 0..6 {
            focus = focus.next();
        }
        assert_eq!(focus, ManualAddFocus::Symbol);
    }
}
