//! User registration, login/logout, profile lookup and edit, capability grant.

use tracing::info;

use estate_core::{GroupStore, NewUser, UserPatch, UserStore};

use crate::app::dto::{
    GroupListReply, LogInArgs, LogInReply, TokenArgs, UserCreateArgs, UserEditArgs,
    UserInfoReply, UserLookupArgs, UserSetManagesGroupsArgs,
};
use crate::app::errors::HandlerError;
use crate::app::services::Services;
use crate::authz;

pub async fn create(services: &Services, args: UserCreateArgs) -> Result<(), HandlerError> {
    let pass_hash = services.hasher().hash(args.password).await?;
    let id = services
        .store
        .create_user(NewUser {
            login: args.login,
            pass_hash,
            first_name: args.first_name,
            last_name: args.last_name,
            patronymic: args.patronymic.filter(|p| !p.is_empty()),
        })
        .await?;
    info!(user_id = %id, "user registered");
    Ok(())
}

pub async fn log_in(services: &Services, args: LogInArgs) -> Result<LogInReply, HandlerError> {
    let session = services.sessions.open_session(&args.login, &args.password).await?;
    Ok(LogInReply {
        token: session.token.into_string(),
    })
}

pub async fn log_out(services: &Services, args: TokenArgs) -> Result<(), HandlerError> {
    services.sessions.close_session(&args.token).await?;
    Ok(())
}

pub async fn info(services: &Services, args: UserLookupArgs) -> Result<UserInfoReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;
    let user = services.store.user_by_login(&args.login).await?;
    Ok(UserInfoReply {
        login: user.login,
        first_name: user.first_name,
        last_name: user.last_name,
        patronymic: user.patronymic,
        manages_groups: user.manages_groups,
    })
}

/// Edit the caller's own record. The target id comes from the session only.
pub async fn edit(services: &Services, args: UserEditArgs) -> Result<(), HandlerError> {
    let user_id = authz::acting_user(services, &args.token).await?;

    let pass_hash = match args.password {
        Some(password) => Some(services.hasher().hash(password).await?),
        None => None,
    };
    let patch = UserPatch {
        login: args.login,
        pass_hash,
        first_name: args.first_name,
        last_name: args.last_name,
        patronymic: args.patronymic,
    };
    if patch.is_empty() {
        return Ok(());
    }

    services.store.update_user(user_id, patch).await?;
    Ok(())
}

pub async fn set_manages_groups(
    services: &Services,
    args: UserSetManagesGroupsArgs,
) -> Result<(), HandlerError> {
    authz::require_manages_groups(services, &args.token).await?;

    let target = services.store.user_by_login(&args.login).await?;
    services.store.set_manages_groups(target.id, args.value).await?;
    info!(user_id = %target.id, value = args.value, "group management capability changed");
    Ok(())
}

pub async fn list_groups(
    services: &Services,
    args: UserLookupArgs,
) -> Result<GroupListReply, HandlerError> {
    authz::acting_user(services, &args.token).await?;

    let user = services.store.user_by_login(&args.login).await?;
    let groups: Vec<String> = services
        .store
        .groups_of_user(user.id)
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect();
    Ok(GroupListReply {
        count: groups.len(),
        groups,
    })
}
