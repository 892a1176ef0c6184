pub mod auth;
pub mod category;
pub mod expense;
pub mod filters;
pub mod user;

pub use auth::{AuthResponse, LoginRequest};
pub use category::{
    Category, CategoryListResponse, CategoryOwner, CategoryResponse, CategoryStats,
    CategoryStatsResponse, CreateCategoryRequest, DEFAULT_CATEGORIES, DefaultCategory,
    OwnedCategory, UpdateCategoryRequest,
};
pub use expense::{CategorySummary, CreateExpenseRequest, Expense, NewExpense, UpdateExpenseRequest};
pub use filters::{
    ExpenseFilter, ExpenseListResponse, ExpensePage, ExpenseQuery, ExpenseQueryParams,
    ExpenseSummary, ExpenseTotals, Pagination, SortBy, SortOrder,
};
pub use user::{CreateUserRequest, UpdateProfileRequest, User};
