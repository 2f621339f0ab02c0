//! Endpoint descriptors for every call the client makes.

pub mod auth {
    use crate::endpoint::Endpoint;

    pub fn sign_in() -> Endpoint {
        Endpoint::post("auth/login").public()
    }

    /// Authenticated with the refresh token, not the access token, so the
    /// executor must not attach its own bearer header.
    pub fn refresh() -> Endpoint {
        Endpoint::post("auth/refresh").public()
    }

    pub fn sign_out() -> Endpoint {
        Endpoint::post("auth/logout")
    }
}

pub mod stories {
    use crate::endpoint::Endpoint;
    use quotebook_protocol::EntityId;
    use quotebook_protocol::UserId;

    pub fn mine() -> Endpoint {
        Endpoint::get("stories/me")
    }

    pub fn public() -> Endpoint {
        Endpoint::get("stories/public")
    }

    pub fn by_author(author: &UserId) -> Endpoint {
        Endpoint::get(format!("users/{author}/stories"))
    }

    pub fn search(keyword: &str) -> Endpoint {
        Endpoint::get("stories/search").with_query("keyword", keyword)
    }

    pub fn in_theme(theme: &EntityId) -> Endpoint {
        Endpoint::get(format!("themes/{theme}/stories"))
    }

    pub fn detail(id: &EntityId) -> Endpoint {
        Endpoint::get(format!("stories/{id}"))
    }

    pub fn create() -> Endpoint {
        Endpoint::post("stories")
    }

    pub fn update(id: &EntityId) -> Endpoint {
        Endpoint::put(format!("stories/{id}"))
    }

    pub fn delete(id: &EntityId) -> Endpoint {
        Endpoint::delete(format!("stories/{id}"))
    }
}

pub mod themes {
    use crate::endpoint::Endpoint;
    use quotebook_protocol::EntityId;
    use quotebook_protocol::UserId;

    pub fn mine() -> Endpoint {
        Endpoint::get("themes/me")
    }

    pub fn public() -> Endpoint {
        Endpoint::get("themes/public")
    }

    pub fn by_author(author: &UserId) -> Endpoint {
        Endpoint::get(format!("users/{author}/themes"))
    }

    pub fn detail(id: &EntityId) -> Endpoint {
        Endpoint::get(format!("themes/{id}"))
    }

    pub fn create() -> Endpoint {
        Endpoint::post("themes")
    }

    pub fn update(id: &EntityId) -> Endpoint {
        Endpoint::put(format!("themes/{id}"))
    }

    pub fn delete(id: &EntityId) -> Endpoint {
        Endpoint::delete(format!("themes/{id}"))
    }
}
