//! Crisis catalogs, restock prompts, and the decision desk.
//!
//! A [`Decision`] is a plain value. It becomes live when the
//! [`DecisionDesk`] presents it: the desk assigns a [`PresentationId`],
//! schedules a timeout on the store scheduler, and tracks the presentation
//! through `Presented -> Resolved(side | timeout)`. A presentation resolves
//! exactly once; the second attempt fails with
//! [`DecisionError::AlreadyResolved`].
//!
//! Silence favours the right (deny/default) branch: an expired
//! presentation resolves to [`Resolution::TimedOut`], which applies the
//! right choice.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::Rng;
use supermart_types::{
    Choice, ChoiceSide, Decision, Item, MeterDelta, PresentationId, Resolution,
};

use crate::clock::{ClockError, GameInstant};
use crate::config::{CrisisCatalogKind, RestockConfig};
use crate::scheduler::{Scheduler, StoreTask, TaskHandle};

/// Errors raised by the decision desk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// A catalog must contain at least one decision.
    #[error("decision catalog is empty")]
    EmptyCatalog,

    /// No presentation with this id was ever made.
    #[error("unknown presentation {0}")]
    UnknownPresentation(PresentationId),

    /// The presentation already reached its terminal state.
    #[error("presentation {0} is already resolved")]
    AlreadyResolved(PresentationId),
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

/// A fixed, non-empty, ordered pool of crisis templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionCatalog {
    head: Decision,
    rest: Vec<Decision>,
}

impl DecisionCatalog {
    /// Build a catalog from an ordered list.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::EmptyCatalog`] if `decisions` is empty.
    pub fn new(decisions: Vec<Decision>) -> Result<Self, DecisionError> {
        let mut iter = decisions.into_iter();
        let head = iter.next().ok_or(DecisionError::EmptyCatalog)?;
        Ok(Self {
            head,
            rest: iter.collect(),
        })
    }

    /// The built-in catalog for `kind`.
    pub fn builtin(kind: CrisisCatalogKind) -> Self {
        match kind {
            CrisisCatalogKind::Supermarket => Self::supermarket(),
            CrisisCatalogKind::CarWash => Self::car_wash(),
        }
    }

    /// The five supermarket crises.
    pub fn supermarket() -> Self {
        Self {
            head: crisis(
                "Staff demands raises!",
                ("Approve (+Morale, -Profit)", MeterDelta::new(0, 0, -15, 20)),
                ("Deny (-Morale, +Profit)", MeterDelta::new(0, 0, 10, -15)),
            ),
            rest: vec![
                crisis(
                    "Customer complains about expired products!",
                    ("Full Refund (+Satisfaction, -Profit)", MeterDelta::new(0, 15, -10, 0)),
                    ("Ignore (-Satisfaction)", MeterDelta::new(0, -20, 0, 0)),
                ),
                crisis(
                    "Supplier offers bulk discount!",
                    ("Buy More (+Stock, -Profit)", MeterDelta::new(30, 0, -20, 0)),
                    ("Decline", MeterDelta::ZERO),
                ),
                crisis(
                    "Health Inspector Visit!",
                    ("Thorough Cleaning (-Profit)", MeterDelta::new(0, 10, -15, 5)),
                    ("Quick Fix (-Satisfaction)", MeterDelta::new(0, -15, -5, -5)),
                ),
                crisis(
                    "Weekend Rush Expected!",
                    ("Hire Temp Staff (-Profit, +Stock)", MeterDelta::new(15, 10, -15, 5)),
                    (
                        "Handle with Current Staff (-Morale)",
                        MeterDelta::new(-10, -5, 0, -15),
                    ),
                ),
            ],
        }
    }

    /// The two car-wash crises.
    pub fn car_wash() -> Self {
        Self {
            head: crisis(
                "Customer demands a free wash!",
                ("Offer free wash (+Satisfaction, -Profit)", MeterDelta::new(0, 20, -10, 0)),
                ("Deny request (-Satisfaction)", MeterDelta::new(0, -15, 0, 0)),
            ),
            rest: vec![crisis(
                "Staff requests better equipment!",
                ("Approve purchase (+Morale, -Profit)", MeterDelta::new(0, 0, -20, 15)),
                ("Decline (-Morale)", MeterDelta::new(0, 0, 0, -10)),
            )],
        }
    }

    /// Number of templates (always at least one).
    pub fn len(&self) -> usize {
        self.rest.len().saturating_add(1)
    }

    /// Always false; present for API symmetry with collections.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Templates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Decision> {
        std::iter::once(&self.head).chain(self.rest.iter())
    }

    /// Pick a template uniformly at random.
    pub fn pick<G: Rng + ?Sized>(&self, rng: &mut G) -> &Decision {
        let index = rng.random_range(0..self.len());
        self.iter().nth(index).unwrap_or(&self.head)
    }
}

fn crisis(
    description: &str,
    left: (&str, MeterDelta),
    right: (&str, MeterDelta),
) -> Decision {
    Decision {
        description: description.to_owned(),
        left: Choice::new(left.0, left.1),
        right: Choice::new(right.0, right.1),
        item_id: None,
    }
}

// ---------------------------------------------------------------------------
// Restock prompts
// ---------------------------------------------------------------------------

/// When an item counts as low on stock and what restocking it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestockPolicy {
    /// Items with fewer units than this are low.
    pub threshold: u32,
    /// Units added by one restock.
    pub quantity: u32,
    /// Profit meter cost of one restock.
    pub profit_cost: i32,
}

impl RestockPolicy {
    /// The meter delta of accepting one restock.
    pub fn delta(&self) -> MeterDelta {
        let quantity = i32::try_from(self.quantity).unwrap_or(i32::MAX);
        MeterDelta::new(quantity, 0, self.profit_cost.saturating_neg(), 0)
    }

    /// Whether `item` is below the threshold.
    pub const fn is_low(&self, item: &Item) -> bool {
        item.stock_level < self.threshold
    }
}

impl Default for RestockPolicy {
    fn default() -> Self {
        Self::from(&RestockConfig::default())
    }
}

impl From<&RestockConfig> for RestockPolicy {
    fn from(config: &RestockConfig) -> Self {
        Self {
            threshold: config.threshold,
            quantity: config.quantity,
            profit_cost: config.profit_cost,
        }
    }
}

/// Synthesize the restock prompt for one item.
pub fn restock_decision(item: &Item, policy: &RestockPolicy) -> Decision {
    Decision {
        description: format!(
            "Restock {}? (Cost: {} Profit)",
            item.name, policy.profit_cost
        ),
        left: Choice::new("Yes", policy.delta()),
        right: Choice::new("No", MeterDelta::ZERO),
        item_id: Some(item.id),
    }
}

/// One restock prompt per low item, in item-id order.
pub fn restock_decisions(items: &[Item], policy: &RestockPolicy) -> Vec<Decision> {
    let mut low: Vec<&Item> = items.iter().filter(|item| policy.is_low(item)).collect();
    low.sort_by_key(|item| item.id);
    low.into_iter()
        .map(|item| restock_decision(item, policy))
        .collect()
}

// ---------------------------------------------------------------------------
// Presentations
// ---------------------------------------------------------------------------

/// A decision on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    /// Presentation identifier.
    pub id: PresentationId,
    /// The decision shown.
    pub decision: Decision,
    /// When it was presented.
    pub presented_at: GameInstant,
    /// When it times out.
    pub deadline: GameInstant,
    timeout: Option<TaskHandle>,
}

/// A presentation that just reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDecision {
    /// Presentation identifier.
    pub id: PresentationId,
    /// The decision that was shown.
    pub decision: Decision,
    /// How it resolved.
    pub resolution: Resolution,
}

impl ResolvedDecision {
    /// The applied branch.
    pub const fn choice(&self) -> &Choice {
        self.decision.choice(self.resolution.side())
    }

    /// The deltas of the applied branch.
    pub const fn delta(&self) -> MeterDelta {
        self.choice().delta
    }
}

/// Tracks the presentations still on screen.
///
/// Ids are handed out in increasing order and never reused, so a resolved
/// presentation is dropped from the desk and later answers to it are
/// recognised by id alone.
#[derive(Debug, Clone)]
pub struct DecisionDesk {
    presentations: BTreeMap<PresentationId, Presentation>,
    next_id: u64,
}

impl Default for DecisionDesk {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionDesk {
    /// An empty desk.
    pub const fn new() -> Self {
        Self {
            presentations: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Put `decision` on screen and schedule its timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the deadline is not representable;
    /// nothing is presented in that case.
    pub fn present(
        &mut self,
        decision: Decision,
        now: GameInstant,
        timeout: Duration,
        scheduler: &mut Scheduler<StoreTask>,
    ) -> Result<PresentationId, ClockError> {
        let deadline = now.checked_add(timeout).ok_or(ClockError::Overflow)?;
        let id = PresentationId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let handle = scheduler.schedule_at(deadline, StoreTask::DecisionTimeout(id));
        self.presentations.insert(
            id,
            Presentation {
                id,
                decision,
                presented_at: now,
                deadline,
                timeout: Some(handle),
            },
        );
        Ok(id)
    }

    /// Resolve a presentation by explicit choice, cancelling its timeout.
    ///
    /// # Errors
    ///
    /// [`DecisionError::UnknownPresentation`] for an unknown id,
    /// [`DecisionError::AlreadyResolved`] if it already resolved.
    pub fn resolve(
        &mut self,
        id: PresentationId,
        side: ChoiceSide,
        scheduler: &mut Scheduler<StoreTask>,
    ) -> Result<ResolvedDecision, DecisionError> {
        let (resolved, timeout) = self.finish(id, Resolution::Chosen(side))?;
        if let Some(handle) = timeout {
            scheduler.cancel(handle);
        }
        Ok(resolved)
    }

    /// Resolve a presentation whose timeout fired.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionDesk::resolve`].
    pub fn expire(&mut self, id: PresentationId) -> Result<ResolvedDecision, DecisionError> {
        self.finish(id, Resolution::TimedOut).map(|(resolved, _)| resolved)
    }

    fn finish(
        &mut self,
        id: PresentationId,
        resolution: Resolution,
    ) -> Result<(ResolvedDecision, Option<TaskHandle>), DecisionError> {
        let Some(presentation) = self.presentations.remove(&id) else {
            return Err(if self.was_issued(id) {
                DecisionError::AlreadyResolved(id)
            } else {
                DecisionError::UnknownPresentation(id)
            });
        };
        Ok((
            ResolvedDecision {
                id,
                decision: presentation.decision,
                resolution,
            },
            presentation.timeout,
        ))
    }

    const fn was_issued(&self, id: PresentationId) -> bool {
        id.0 > 0 && id.0 < self.next_id
    }

    /// Look up a presentation still on screen.
    pub fn get(&self, id: PresentationId) -> Option<&Presentation> {
        self.presentations.get(&id)
    }

    /// Presentations still awaiting an answer, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Presentation> {
        self.presentations.values()
    }

    /// Number of presentations on screen.
    pub fn len(&self) -> usize {
        self.presentations.len()
    }

    /// Whether nothing is on screen.
    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty()
    }

    /// Forget every presentation. Ids keep counting up.
    pub fn clear(&mut self) {
        self.presentations.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;
    use supermart_types::{ItemId, ShelfPosition};

    use super::*;

    fn item(id: i64, name: &str, stock_level: u32) -> Item {
        Item {
            id: ItemId::new(id),
            name: name.to_owned(),
            stock_level,
            sales_count: 0,
            unit_price: Decimal::ONE,
            shelf: ShelfPosition::default(),
        }
    }

    #[test]
    fn empty_catalog_rejected() {
        assert_eq!(DecisionCatalog::new(Vec::new()), Err(DecisionError::EmptyCatalog));
    }

    #[test]
    fn builtin_catalogs_have_expected_sizes() {
        assert_eq!(DecisionCatalog::supermarket().len(), 5);
        assert_eq!(DecisionCatalog::car_wash().len(), 2);
        let raises = DecisionCatalog::supermarket().iter().next().cloned().unwrap();
        assert_eq!(raises.left.delta, MeterDelta::new(0, 0, -15, 20));
        assert_eq!(raises.right.delta, MeterDelta::new(0, 0, 10, -15));
    }

    #[test]
    fn pick_is_deterministic_and_covers_catalog() {
        let catalog = DecisionCatalog::supermarket();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let left = catalog.pick(&mut a);
            assert_eq!(left, catalog.pick(&mut b));
            seen.insert(left.description.clone());
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn restock_prompts_in_id_order() {
        let items = vec![
            item(3, "Apple", 2),
            item(1, "Milk", 9),
            item(2, "Bread", 10),
        ];
        let decisions = restock_decisions(&items, &RestockPolicy::default());
        let ids: Vec<_> = decisions.iter().filter_map(|d| d.item_id).collect();
        assert_eq!(ids, vec![ItemId::new(1), ItemId::new(3)]);

        let milk = decisions.first().unwrap();
        assert_eq!(milk.description, "Restock Milk? (Cost: 5 Profit)");
        assert_eq!(milk.left.label, "Yes");
        assert_eq!(milk.left.delta, MeterDelta::new(20, 0, -5, 0));
        assert!(milk.right.delta.is_zero());
    }

    #[test]
    fn resolve_cancels_timeout() {
        let mut desk = DecisionDesk::new();
        let mut scheduler = Scheduler::new();
        let decision = DecisionCatalog::supermarket().iter().next().cloned().unwrap();
        let id = desk
            .present(decision, GameInstant::ZERO, Duration::from_secs(10), &mut scheduler)
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        let resolved = desk.resolve(id, ChoiceSide::Left, &mut scheduler).unwrap();
        assert_eq!(resolved.delta(), MeterDelta::new(0, 0, -15, 20));
        assert!(scheduler.is_empty());
        assert_eq!(desk.pending().count(), 0);
    }

    #[test]
    fn double_resolution_fails() {
        let mut desk = DecisionDesk::new();
        let mut scheduler = Scheduler::new();
        let decision = DecisionCatalog::car_wash().iter().next().cloned().unwrap();
        let id = desk
            .present(decision, GameInstant::ZERO, Duration::from_secs(10), &mut scheduler)
            .unwrap();

        desk.resolve(id, ChoiceSide::Right, &mut scheduler).unwrap();
        assert_eq!(
            desk.resolve(id, ChoiceSide::Left, &mut scheduler),
            Err(DecisionError::AlreadyResolved(id))
        );
        assert_eq!(desk.expire(id), Err(DecisionError::AlreadyResolved(id)));
    }

    #[test]
    fn expiry_applies_right_branch() {
        let mut desk = DecisionDesk::new();
        let mut scheduler = Scheduler::new();
        let decision = DecisionCatalog::car_wash().iter().next().cloned().unwrap();
        let id = desk
            .present(decision, GameInstant::ZERO, Duration::from_secs(10), &mut scheduler)
            .unwrap();

        let fired = scheduler.pop_due(GameInstant::from_millis(10_000));
        assert_eq!(fired.map(|(_, t)| t), Some(StoreTask::DecisionTimeout(id)));

        let resolved = desk.expire(id).unwrap();
        assert!(resolved.resolution.timed_out());
        assert_eq!(resolved.delta(), MeterDelta::new(0, -15, 0, 0));
    }

    #[test]
    fn resolved_presentations_leave_the_desk() {
        let mut desk = DecisionDesk::new();
        let mut scheduler = Scheduler::new();
        let decision = DecisionCatalog::supermarket().iter().next().cloned().unwrap();
        for _ in 0..50 {
            let id = desk
                .present(
                    decision.clone(),
                    GameInstant::ZERO,
                    Duration::from_secs(10),
                    &mut scheduler,
                )
                .unwrap();
            desk.resolve(id, ChoiceSide::Left, &mut scheduler).unwrap();
        }
        assert!(desk.is_empty());
        assert!(desk.get(PresentationId(50)).is_none());
        assert_eq!(
            desk.expire(PresentationId(50)),
            Err(DecisionError::AlreadyResolved(PresentationId(50)))
        );
        assert_eq!(
            desk.expire(PresentationId(51)),
            Err(DecisionError::UnknownPresentation(PresentationId(51)))
        );
    }

    #[test]
    fn unknown_presentation() {
        let mut desk = DecisionDesk::new();
        assert_eq!(
            desk.expire(PresentationId(42)),
            Err(DecisionError::UnknownPresentation(PresentationId(42)))
        );
    }
}
