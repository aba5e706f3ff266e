use super::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavLink {
    Dashboard,
    Routing,
    User,
    Logout,
    Login,
    Signup,
}

impl NavLink {
    /// Logout is an action; its path is where the user lands afterwards.
    pub fn path(self) -> &'static str {
        match self {
            NavLink::Dashboard => "/dashboard",
            NavLink::Routing => "/route-planner",
            NavLink::User => "/user",
            NavLink::Logout | NavLink::Login => "/login",
            NavLink::Signup => "/signup",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NavLink::Dashboard => "Dashboard",
            NavLink::Routing => "Routing",
            NavLink::User => "User",
            NavLink::Logout => "Logout",
            NavLink::Login => "Login",
            NavLink::Signup => "Signup",
        }
    }
}

pub fn visible_links(session: &Session) -> Vec<NavLink> {
    let mut links = vec![NavLink::Dashboard, NavLink::Routing];
    if session.is_authenticated() {
        links.extend([NavLink::User, NavLink::Logout]);
    } else {
        links.extend([NavLink::Login, NavLink::Signup]);
    }
    links
}
