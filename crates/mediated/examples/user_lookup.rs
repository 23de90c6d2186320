use data_contract::{BoxError, Convert, MapperRegistry, Prep, UnitPrep};
use mediated_contract::{
    CancellationToken, DefaultMediatedContractFactory, DispatchRequest, MediatedContractFactory, Mediator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Debug)]
struct UserRequest {
    id: u32,
    #[serde(default)]
    verbose: bool,
}

#[derive(Debug, Clone)]
struct GetUser {
    user_id: u32,
}

impl DispatchRequest for GetUser {
    type Output = User;
}

#[derive(Debug, Clone, Default)]
struct ListUsers {
    limit: usize,
}

impl DispatchRequest for ListUsers {
    type Output = Vec<User>;
}

#[derive(Debug, Clone)]
struct User {
    id: u32,
    name: String,
    email: String,
}

#[derive(Serialize, Debug)]
struct UserResponse {
    user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Serialize, Debug)]
struct Directory {
    users: Vec<String>,
    limit: usize,
}

const USERS: [(u32, &str); 3] = [(1, "Ann"), (2, "Bob"), (5, "Cid")];

async fn get_user(query: GetUser, cancel: CancellationToken) -> Result<User, BoxError> {
    tokio::select! {
        () = cancel.cancelled() => Err("lookup cancelled".into()),
        () = tokio::task::yield_now() => USERS
            .iter()
            .find(|(id, _)| *id == query.user_id)
            .map(|(id, name)| User { id: *id, name: (*name).to_owned(), email: format!("{}@example.com", name.to_lowercase()) })
            .ok_or_else(|| format!("user {} not found", query.user_id).into()),
    }
}

async fn list_users(list: ListUsers, _cancel: CancellationToken) -> Result<Vec<User>, BoxError> {
    Ok(USERS
        .iter()
        .take(list.limit)
        .map(|(id, name)| User { id: *id, name: (*name).to_owned(), email: String::new() })
        .collect())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mapper = MapperRegistry::builder()
        .register(|request: &UserRequest| GetUser { user_id: request.id })
        .register(|user: &User| UserResponse { user_name: user.name.clone(), email: None })
        .register(|users: &Vec<User>| Directory { users: users.iter().map(|user| user.name.clone()).collect(), limit: 0 })
        .build();

    let mediator = Mediator::builder().handler(get_user).handler(list_users).build();

    let factory = DefaultMediatedContractFactory::new(Arc::new(mapper), Arc::new(mediator));

    let lookup = factory.create_contract::<UserRequest, UserResponse>().mediate::<GetUser>(
        Prep::Skip,
        Convert::sync(|request: UserRequest, user: User, mut response: UserResponse| {
            if request.verbose {
                response.email = Some(user.email);
            }
            info!(id = user.id, "user found");
            Ok(response)
        }),
    );

    let directory = factory.create_unit_contract::<Directory>().mediate::<ListUsers>(
        UnitPrep::sync(|mut list: ListUsers| {
            list.limit = 2;
            Ok(list)
        }),
        Convert::sync(|list: ListUsers, _users: Vec<User>, mut directory: Directory| {
            directory.limit = list.limit;
            Ok(directory)
        }),
    );

    for body in [r#"{"id": 5}"#, r#"{"id": 1, "verbose": true}"#, r#"{"id": 9}"#] {
        let request: UserRequest = serde_json::from_str(body)?;
        match lookup.call(request).await {
            Ok(Some(response)) => info!("{}", serde_json::to_string(&response)?),
            Ok(None) => warn!("lookup produced no response"),
            Err(e) => warn!(cause = %e, "lookup failed"),
        }
    }

    if let Some(directory) = directory.call().await? {
        info!("{}", serde_json::to_string_pretty(&directory)?);
    }

    Ok(())
}
