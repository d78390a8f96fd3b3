use actix_web::web::{self};

pub mod routes {
    pub mod contact;
    pub mod donate;
}

mod services {
    pub(crate) mod orchestrate;
    pub(crate) mod portal;
    pub(crate) mod reconcile;
}

mod dtos {
    pub(crate) mod donate;
}

mod misc {
    pub(crate) mod redirect;
}

pub fn mount_donations() -> actix_web::Scope {
    web::scope("/donations")
        .service(routes::donate::post_checkout)
        .service(routes::donate::post_portal)
        .service(routes::donate::get_capture)
        .service(routes::donate::post_webhook)
}

pub fn mount_contact() -> actix_web::Scope {
    web::scope("/contact").service(routes::contact::post_contact)
}
