//! Structure CRUD and search. Requires a live session.

use estate_core::{StructureId, StructureStore};

use crate::app::dto::{
    IdArgs, IdReply, StructCreateArgs, StructEditArgs, StructFindArgs, StructFindReply,
    StructureReply,
};
use crate::app::errors::HandlerError;
use crate::app::services::Services;
use crate::authz;

pub async fn create(services: &Services, args: StructCreateArgs) -> Result<IdReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;
    let id = services.store.create_structure(args.into_new()).await?;
    Ok(IdReply { id: id.get() })
}

pub async fn info(services: &Services, args: IdArgs) -> Result<StructureReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;
    let structure = services.store.structure_by_id(StructureId::new(args.id)).await?;
    Ok(structure.into())
}

pub async fn edit(services: &Services, args: StructEditArgs) -> Result<(), HandlerError> {
    let (token, id, patch) = args.split();
    authz::acting_user(services, &token).await?;
    services.store.update_structure(id, patch).await?;
    Ok(())
}

/// Removes the structure together with its tasks.
pub async fn remove(services: &Services, args: IdArgs) -> Result<(), HandlerError> {
    authz::acting_user(services, &args.token).await?;
    services.store.remove_structure(StructureId::new(args.id)).await?;
    Ok(())
}

pub async fn find(services: &Services, args: StructFindArgs) -> Result<StructFindReply, HandlerError> {
    let (token, filter, page) = args.split();
    authz::acting_user(services, &token).await?;
    let structures: Vec<StructureReply> = services
        .store
        .find_structures(&filter, page)
        .await?
        .into_iter()
        .map(StructureReply::from)
        .collect();
    Ok(StructFindReply {
        count: structures.len(),
        structures,
    })
}
