//! Interaction Manager Plugin
//!
//! The coordination backbone every pointer-driven plugin depends on:
//! selection, annotation and zoom marquee register handlers against modes
//! here instead of competing for raw DOM events. One mode is active at a
//! time; activating another mode retires the outgoing mode's handlers,
//! clears cursor claims and notifies subscribers.

use crate::interaction::cursor::CursorClaims;
use crate::interaction::error::{InteractionError, InteractionResult};
use crate::interaction::handlers::{
    fire_active_end, fire_active_start, EventScope, HandlerBuckets, HandlerToken, MergedHandlers,
    ModeHandlerEntry, ModeScope, AlwaysHandlerEntry, PointerEventHandlers,
};
use crate::interaction::state::{
    interaction_reducer, ExclusionRules, InteractionState, ACTIVATE_MODE, SET_CURSOR,
    SET_EXCLUSION_RULES, SET_PAUSED,
};
use crate::core::sync::lock_recover;
use crate::notifications::api::{BehaviorEmitter, Emitter, SubscriptionId};
use crate::plugin::api::{
    Plugin, PluginBase, PluginContext, PluginManifest, PluginPackage, PluginResult,
};
use crate::store::api::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const LOG_SOURCE: &str = "interaction-manager";

/// A named, mutually-exclusive interaction context
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMode {
    pub id: String,
    /// Scope tier this mode's handlers live in
    pub scope: ModeScope,
    /// Signals DOM collaborators to show a blocking overlay while active
    pub exclusive: bool,
    /// Baseline cursor when no claims are present
    pub cursor: String,
}

/// Emitted on every completed mode transition
#[derive(Debug, Clone, PartialEq)]
pub struct ModeChange {
    pub previous: String,
    pub active: String,
}

/// Options for binding handlers to one or more modes
#[derive(Clone, Default)]
pub struct RegisterHandlersOptions {
    pub modes: Vec<String>,
    pub handlers: PointerEventHandlers,
    /// Omitted: global scope; present: that page's scope
    pub page_index: Option<usize>,
}

pub struct InteractionManagerPlugin {
    base: PluginBase<InteractionState>,
    logger: Arc<dyn crate::core::logging::Logger>,
    modes: Arc<Mutex<HashMap<String, InteractionMode>>>,
    buckets: Arc<Mutex<HandlerBuckets>>,
    claims: Arc<Mutex<CursorClaims>>,
    mode_changed: Emitter<ModeChange>,
    handlers_changed: Emitter<()>,
    cursor_changed: BehaviorEmitter<String>,
}

impl InteractionManagerPlugin {
    pub const ID: &'static str = "interaction-manager";
    pub const CAPABILITY: &'static str = "interaction-manager";

    pub fn manifest() -> PluginManifest {
        let mut default_config = toml::Table::new();
        default_config.insert(
            "default_mode".to_string(),
            toml::Value::String("default".to_string()),
        );
        default_config.insert(
            "default_cursor".to_string(),
            toml::Value::String("auto".to_string()),
        );
        PluginManifest::new(Self::ID, "Interaction Manager", env!("CARGO_PKG_VERSION"))
            .with_provides(&[Self::CAPABILITY])
            .with_default_config(default_config)
    }

    /// Package for registry registration
    pub fn package() -> PluginPackage {
        PluginPackage::with_initial_state_from_core(
            Self::manifest(),
            |context, config| Ok(Box::new(Self::new(context, config)?) as Box<dyn Plugin>),
            interaction_reducer,
            |_core, config| {
                let default_mode = config_str(config, "default_mode", "default");
                let default_cursor = config_str(config, "default_cursor", "auto");
                InteractionState {
                    active_mode: default_mode.clone(),
                    default_mode,
                    cursor: default_cursor,
                    ..InteractionState::default()
                }
            },
        )
    }

    pub fn new(context: &PluginContext, config: &toml::Table) -> PluginResult<Self> {
        let base = PluginBase::new(Self::ID, context)?;
        let plugin = Self {
            base,
            logger: context.logger(),
            modes: Arc::new(Mutex::new(HashMap::new())),
            buckets: Arc::new(Mutex::new(HandlerBuckets::default())),
            claims: Arc::new(Mutex::new(CursorClaims::default())),
            mode_changed: Emitter::new(),
            handlers_changed: Emitter::new(),
            cursor_changed: BehaviorEmitter::new(),
        };

        let default_mode = config_str(config, "default_mode", "default");
        let default_cursor = config_str(config, "default_cursor", "auto");
        plugin.register_mode(InteractionMode {
            id: default_mode,
            scope: ModeScope::Global,
            exclusive: false,
            cursor: default_cursor.clone(),
        });
        // seed the dedupe baseline so the first real change emits
        plugin.cursor_changed.emit(default_cursor);
        Ok(plugin)
    }

    fn state(&self) -> InteractionState {
        self.base.state().unwrap_or_default()
    }

    /// Register a mode; idempotent per id, callable before or after
    /// activation
    pub fn register_mode(&self, mode: InteractionMode) {
        let mut modes = lock_recover(&self.modes);
        if modes.contains_key(&mode.id) {
            return;
        }
        self.logger.debug(
            LOG_SOURCE,
            "mode",
            &format!("mode '{}' registered", mode.id),
        );
        modes.insert(mode.id.clone(), mode);
    }

    pub fn active_mode(&self) -> String {
        self.state().active_mode
    }

    pub fn get_active_interaction_mode(&self) -> Option<InteractionMode> {
        lock_recover(&self.modes).get(&self.active_mode()).cloned()
    }

    pub fn active_mode_is_exclusive(&self) -> bool {
        self.get_active_interaction_mode()
            .map(|mode| mode.exclusive)
            .unwrap_or(false)
    }

    /// Switch the active mode
    ///
    /// Unknown ids are an error; re-activating the current mode is a no-op
    /// that fires nothing.
    pub fn activate(&self, mode_id: &str) -> InteractionResult<()> {
        if !lock_recover(&self.modes).contains_key(mode_id) {
            return Err(InteractionError::ModeNotRegistered {
                mode_id: mode_id.to_string(),
            });
        }
        let previous = self.active_mode();
        if previous == mode_id {
            return Ok(());
        }

        lock_recover(&self.claims).clear();

        let (outgoing_sets, always_sets, incoming_sets) = {
            let buckets = lock_recover(&self.buckets);
            (
                buckets.sets_for_mode(&previous),
                buckets.always_sets(),
                buckets.sets_for_mode(mode_id),
            )
        };
        fire_active_end(&outgoing_sets);
        fire_active_end(&always_sets);

        let _ = self.base.dispatch(&Action::with_payload(
            ACTIVATE_MODE,
            serde_json::json!({"mode": mode_id}),
        ));

        self.refresh_cursor();

        fire_active_start(&incoming_sets);
        fire_active_start(&always_sets);

        self.logger.debug(
            LOG_SOURCE,
            "mode",
            &format!("mode '{}' -> '{}'", previous, mode_id),
        );
        self.mode_changed.emit(&ModeChange {
            previous,
            active: mode_id.to_string(),
        });
        Ok(())
    }

    /// Bind handlers to one or more modes; they run only while one of
    /// those modes is active, within the declared scope
    pub fn register_handlers(&self, options: RegisterHandlersOptions) -> HandlerToken {
        let scope = options
            .page_index
            .map(EventScope::Page)
            .unwrap_or(EventScope::Global);
        let token = {
            let mut buckets = lock_recover(&self.buckets);
            let token = buckets.next_token();
            buckets.mode_entries.push(ModeHandlerEntry {
                token,
                modes: options.modes,
                scope,
                handlers: options.handlers,
            });
            token
        };
        self.handlers_changed.emit(&());
        token
    }

    /// Bind handlers regardless of the active mode
    pub fn register_always(&self, scope: EventScope, handlers: PointerEventHandlers) -> HandlerToken {
        let token = {
            let mut buckets = lock_recover(&self.buckets);
            let token = buckets.next_token();
            buckets.always_entries.push(AlwaysHandlerEntry {
                token,
                scope,
                handlers,
            });
            token
        };
        self.handlers_changed.emit(&());
        token
    }

    /// Drop a handler binding; true if it was still registered
    pub fn unregister(&self, token: HandlerToken) -> bool {
        let removed = lock_recover(&self.buckets).remove(token);
        if removed {
            self.handlers_changed.emit(&());
        }
        removed
    }

    /// Merged handlers live for a scope query
    ///
    /// Always-handlers for the scope come first, then the active mode's
    /// handlers, but only when the mode's own declared scope tier matches
    /// the queried scope. A page-scoped mode never contributes to a global
    /// query and vice versa.
    pub fn handlers_for_scope(&self, scope: &EventScope) -> MergedHandlers {
        let active = self.active_mode();
        let mode_tier_matches = lock_recover(&self.modes)
            .get(&active)
            .map(|mode| scope.same_tier(mode.scope))
            .unwrap_or(false);

        let buckets = lock_recover(&self.buckets);
        let mut sets: Vec<PointerEventHandlers> = buckets
            .always_entries
            .iter()
            .filter(|entry| entry.scope == *scope)
            .map(|entry| entry.handlers.clone())
            .collect();
        if mode_tier_matches {
            sets.extend(
                buckets
                    .mode_entries
                    .iter()
                    .filter(|entry| {
                        entry.scope == *scope && entry.modes.iter().any(|m| m == &active)
                    })
                    .map(|entry| entry.handlers.clone()),
            );
        }
        MergedHandlers::new(sets)
    }

    /// Claim the cursor; the claim with the highest priority wins, ties go
    /// to the most recent claim
    pub fn set_cursor(&self, token: &str, cursor: &str, priority: i32) {
        lock_recover(&self.claims).set(token, cursor, priority);
        self.refresh_cursor();
    }

    /// Withdraw a claim; the cursor reverts to the next claim or the active
    /// mode's baseline
    pub fn remove_cursor(&self, token: &str) {
        if lock_recover(&self.claims).remove(token) {
            self.refresh_cursor();
        }
    }

    pub fn get_current_cursor(&self) -> String {
        self.state().cursor
    }

    fn refresh_cursor(&self) {
        let baseline = self
            .get_active_interaction_mode()
            .map(|mode| mode.cursor)
            .unwrap_or_else(|| "auto".to_string());
        let resolved = lock_recover(&self.claims).resolve(&baseline);
        if resolved != self.state().cursor {
            let _ = self.base.dispatch(&Action::with_payload(
                SET_CURSOR,
                serde_json::json!({"cursor": resolved}),
            ));
        }
        // deduplicated: quiet unless the resolved cursor actually changed
        self.cursor_changed.emit_if_changed(resolved);
    }

    /// Suspend pointer-event delivery
    ///
    /// Only the flag is stored here; the DOM adapter checks it before
    /// dispatching into handler sets.
    pub fn pause(&self) {
        if !self.state().paused {
            let _ = self.base.dispatch(&Action::with_payload(
                SET_PAUSED,
                serde_json::json!({"paused": true}),
            ));
        }
    }

    pub fn resume(&self) {
        if self.state().paused {
            let _ = self.base.dispatch(&Action::with_payload(
                SET_PAUSED,
                serde_json::json!({"paused": false}),
            ));
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn exclusion_rules(&self) -> ExclusionRules {
        self.state().exclusion_rules
    }

    pub fn add_exclusion_class(&self, class: &str) {
        let mut rules = self.exclusion_rules();
        if rules.classes.iter().any(|c| c == class) {
            return;
        }
        rules.classes.push(class.to_string());
        self.dispatch_exclusion_rules(rules);
    }

    pub fn remove_exclusion_class(&self, class: &str) {
        let mut rules = self.exclusion_rules();
        let before = rules.classes.len();
        rules.classes.retain(|c| c != class);
        if rules.classes.len() != before {
            self.dispatch_exclusion_rules(rules);
        }
    }

    pub fn add_exclusion_attribute(&self, attribute: &str) {
        let mut rules = self.exclusion_rules();
        if rules.attributes.iter().any(|a| a == attribute) {
            return;
        }
        rules.attributes.push(attribute.to_string());
        self.dispatch_exclusion_rules(rules);
    }

    pub fn remove_exclusion_attribute(&self, attribute: &str) {
        let mut rules = self.exclusion_rules();
        let before = rules.attributes.len();
        rules.attributes.retain(|a| a != attribute);
        if rules.attributes.len() != before {
            self.dispatch_exclusion_rules(rules);
        }
    }

    fn dispatch_exclusion_rules(&self, rules: ExclusionRules) {
        let payload = match serde_json::to_value(&rules) {
            Ok(value) => value,
            Err(_) => return,
        };
        let _ = self.base.dispatch(&Action::with_payload(
            SET_EXCLUSION_RULES,
            serde_json::json!({ "rules": payload }),
        ));
    }

    pub fn on_mode_change(&self, listener: impl Fn(&ModeChange) + Send + Sync + 'static) -> SubscriptionId {
        self.mode_changed.on(listener)
    }

    pub fn on_handler_change(&self, listener: impl Fn(&()) + Send + Sync + 'static) -> SubscriptionId {
        self.handlers_changed.on(listener)
    }

    pub fn on_cursor_change(&self, listener: impl Fn(&String) + Send + Sync + 'static) -> SubscriptionId {
        self.cursor_changed.on(listener)
    }

    /// Store handle used by the DOM adapter to watch slice state
    pub fn base(&self) -> &PluginBase<InteractionState> {
        &self.base
    }
}

#[async_trait::async_trait]
impl Plugin for InteractionManagerPlugin {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn initialize(&mut self, config: &toml::Table) -> PluginResult<()> {
        // reconfiguration keeps existing modes and re-ensures the default
        let default_mode = config_str(config, "default_mode", "default");
        let default_cursor = config_str(config, "default_cursor", "auto");
        self.register_mode(InteractionMode {
            id: default_mode,
            scope: ModeScope::Global,
            exclusive: false,
            cursor: default_cursor,
        });
        self.base.mark_ready();
        Ok(())
    }

    async fn destroy(&mut self) -> PluginResult<()> {
        lock_recover(&self.buckets).clear();
        lock_recover(&self.claims).clear();
        self.mode_changed.clear();
        self.handlers_changed.clear();
        self.cursor_changed.clear();
        Ok(())
    }

    async fn ready(&self) -> PluginResult<()> {
        self.base.ready().await;
        Ok(())
    }
}

impl std::fmt::Debug for InteractionManagerPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionManagerPlugin")
            .field("active_mode", &self.active_mode())
            .field(
                "modes",
                &lock_recover(&self.modes).keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn config_str(config: &toml::Table, key: &str, fallback: &str) -> String {
    config
        .get(key)
        .and_then(|value| value.as_str())
        .unwrap_or(fallback)
        .to_string()
}
