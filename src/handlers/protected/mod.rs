// handlers/protected/mod.rs - Endpoints behind the authentication gate

pub mod me;    // GET {prefix}/me, POST/DELETE {prefix}/me/api-key
pub mod users; // {prefix}/users[/:id]
