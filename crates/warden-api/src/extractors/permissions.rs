//! `(resource, action)` pairs declared by protected routes.
//!
//! Each marker type names one pair; handlers request it through
//! [`Authorized`](super::Authorized), so the pair is fixed when the route
//! is written rather than derived from the request.

/// A route's declared `(resource, action)` pair.
pub trait RoutePermission: Send + Sync + 'static {
    /// Policy object.
    const RESOURCE: &'static str;
    /// Policy action.
    const ACTION: &'static str;
}

macro_rules! route_permission {
    ($(#[$meta:meta])* $name:ident => ($resource:literal, $action:literal)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl RoutePermission for $name {
            const RESOURCE: &'static str = $resource;
            const ACTION: &'static str = $action;
        }
    };
}

route_permission!(
    /// List users or read one user.
    ReadUsers => ("/users", "GET")
);
route_permission!(
    /// Create users on behalf of others.
    CreateUsers => ("/users", "POST")
);
route_permission!(
    /// Update any user.
    UpdateUsers => ("/users", "PUT")
);
route_permission!(
    /// Delete any user.
    DeleteUsers => ("/users", "DELETE")
);
route_permission!(ReadResources => ("/resources", "GET"));
route_permission!(CreateResources => ("/resources", "POST"));
route_permission!(ReadPolicies => ("/policies", "GET"));
route_permission!(AddPolicies => ("/policies", "POST"));
route_permission!(RemovePolicies => ("/policies", "DELETE"));
