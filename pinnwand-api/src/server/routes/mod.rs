use crate::server::ServerRouter;

mod media;
mod posts;
mod profile;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(profile::routes())
        .merge(media::routes())
}
