pub mod common;
pub mod lock;
pub mod member;
pub mod month;
pub mod records;
pub mod settlement;

pub use common::{Approvable, Identifiable, MonthScoped, NamedEntity};
pub use lock::{LockPhase, MonthLockState};
pub use member::{Member, MemberStatus, MembershipRoster, Role, UNKNOWN_MEMBER_NAME};
pub use month::MonthKey;
pub use records::{
    CashPayment, CostShare, DailyMealRecord, GroceryPurchase, MealUnit, PaymentKind,
    RecordStatus, SharedCostEntry,
};
pub use settlement::{MemberSettlement, MonthBook, SettlementReport};
