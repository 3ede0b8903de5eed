// Application layer: commands, queries, validation, events, services

pub mod commands;
pub mod events;
pub mod queries;
pub mod services;
pub mod validators;

pub use commands::CommandFactory;
pub use events::{DomainEvent, EventFactory};
pub use queries::{PaginatedResult, Query, QueryFactory, SortOrder};
pub use services::{
    ChartBuilder, HierarchyService, OrgError, OrgResult, PermissionResolver, RoleGraphService,
};
pub use validators::{CommandValidator, ValidationError};
