//! Group lifecycle and membership. Every mutation passes the capability gate first.

use tracing::info;

use estate_core::{GroupStore, UserStore};

use crate::app::dto::{GroupInfoReply, GroupMembershipArgs, GroupNameArgs, IdReply};
use crate::app::errors::HandlerError;
use crate::app::services::Services;
use crate::authz;

pub async fn create(services: &Services, args: GroupNameArgs) -> Result<IdReply, HandlerError> {
    authz::require_manages_groups(services, &args.token).await?;

    let group = services.store.create_group(&args.name).await?;
    info!(group_id = %group.id, name = %group.name, "group created");
    Ok(IdReply { id: group.id.get() })
}

pub async fn remove(services: &Services, args: GroupNameArgs) -> Result<(), HandlerError> {
    authz::require_manages_groups(services, &args.token).await?;

    let group = services.store.group_by_name(&args.name).await?;
    services.store.remove_group(group.id).await?;
    info!(group_id = %group.id, "group removed");
    Ok(())
}

pub async fn add_remove_user(
    services: &Services,
    args: GroupMembershipArgs,
) -> Result<(), HandlerError> {
    authz::require_manages_groups(services, &args.token).await?;

    let group = services.store.group_by_name(&args.group).await?;
    let user = services.store.user_by_login(&args.login).await?;
    if args.action {
        services.store.add_member(group.id, user.id).await?;
    } else {
        services.store.remove_member(group.id, user.id).await?;
    }
    Ok(())
}

pub async fn info(services: &Services, args: GroupNameArgs) -> Result<GroupInfoReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;

    let group = services.store.group_by_name(&args.name).await?;
    let members: Vec<String> = services
        .store
        .members_of_group(group.id)
        .await?
        .into_iter()
        .map(|u| u.login)
        .collect();
    Ok(GroupInfoReply {
        id: group.id,
        name: group.name,
        count: members.len(),
        members,
    })
}
