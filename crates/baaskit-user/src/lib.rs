//! User accounts on a BaasBox-style backend: the entity, the network tasks that act on it,
//! and [`Accounts`], a facade over a dispatcher.

pub mod accounts;
pub mod filter;
pub mod tasks;
pub mod user;

pub use accounts::Accounts;
pub use filter::Filter;
pub use tasks::{
    ChangePassword, FetchLinkedProviders, FetchUser, FetchUsers, Follow, Login, LinkProvider,
    Logout, PasswordReset, Registration, SaveUser, Signup, SocialSignup, Unfollow,
    UnlinkProvider, UserList,
};
pub use user::{Scope, User};
