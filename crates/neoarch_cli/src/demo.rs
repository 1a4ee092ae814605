//! Built-in sample design used by every CLI command.

use neoarch_core::{
    kinds, CanBeUsedBy, CanUse, Design, DesignOptions, DesignResult, ElementRef, InteractsWith,
    Taggable,
};

pub const DEMO_NAME: &str = "Twitter Clone";

/// Two systems with gateways, GraphQL, gRPC services and a cross-system call.
pub fn twitter_clone(options: DesignOptions) -> DesignResult<Design> {
    let mut design = Design::with_options(
        DEMO_NAME,
        "Social + User Systems with API Gateway, GraphQL, gRPC",
        options,
    );

    let user_system = design
        .system("UserSystem", "Handles user management and authentication")?
        .finish();

    let user_gateway = design
        .container(&user_system, "User API Gateway", "HTTP entrypoint")?
        .tag("gateway")
        .finish();
    let user_graphql = design
        .container(&user_system, "User GraphQL", "Orchestrates queries and mutations")?
        .tag("graphql")
        .uses(&user_gateway, "Receives traffic from")
        .finish();
    let user_db = design
        .container(&user_system, "User DB", "Stores user info")?
        .tag("db")
        .finish();
    let user_s3 = design
        .container(&user_system, "User S3", "Stores avatars")?
        .tag("s3")
        .finish();
    let user_worker = design
        .container(&user_system, "User Temporal Worker", "Handles background workflows")?
        .tag("temporal")
        .finish();
    let user_service = design
        .container(&user_system, "User gRPC Service", "Handles core user operations")?
        .tag("grpc")
        .uses(&user_db, "Reads/writes user data")
        .uses(&user_s3, "Stores profile images")
        .uses(&user_worker, "Schedules background jobs")
        .finish();
    design.uses(&user_graphql, &user_service, "Resolves user operations");

    for (name, description) in [
        ("Schema Definition", "Defines User types and fields"),
        ("Query Resolver", "Handles fetching user data"),
        ("Mutation Resolver", "Handles signup, update, etc."),
        ("Middleware", "Cross-cutting GraphQL logic"),
        ("Authorization", "Enforces auth rules"),
    ] {
        design.component(&user_graphql, name, description)?;
    }
    add_grpc_layers(
        &mut design,
        &user_service,
        ["Request-level handling", "Business logic", "Persistence layer"],
    )?;

    let social_system = design
        .system("SocialSystem", "Handles tweets, follows, feeds")?
        .finish();

    let social_gateway = design
        .container(&social_system, "Social API Gateway", "HTTP entrypoint")?
        .tag("gateway")
        .finish();
    let social_graphql = design
        .container(&social_system, "Social GraphQL", "Manages tweet/feed queries")?
        .tag("graphql")
        .uses(&social_gateway, "Receives traffic from")
        .finish();
    let social_db = design
        .container(&social_system, "Social DB", "Stores tweets, follows")?
        .tag("db")
        .finish();
    let social_s3 = design
        .container(&social_system, "Social S3", "Stores tweet media")?
        .tag("s3")
        .finish();
    let social_worker = design
        .container(&social_system, "Social Temporal Worker", "Feed generation and cleanup")?
        .tag("temporal")
        .finish();
    let tweet_service = design
        .container(&social_system, "Tweet gRPC Service", "Tweet logic")?
        .tag("grpc")
        .uses(&social_db, "Reads/writes tweet data")
        .uses(&social_s3, "Stores media")
        .uses(&social_worker, "Schedules tweet workflows")
        .finish();
    let follow_service = design
        .container(&social_system, "Follow gRPC Service", "Follow/unfollow logic")?
        .tag("grpc")
        .uses(&social_db, "Updates following/follower lists")
        .uses(&social_worker, "Schedules notifications")
        .finish();
    design.uses(&social_graphql, &tweet_service, "Resolves tweet ops");
    design.uses(&social_graphql, &follow_service, "Resolves follow ops");

    design.uses(&tweet_service, &user_service, "Fetch user profile info for tweets");
    design.uses(&follow_service, &user_service, "Resolve target user");

    for (name, description) in [
        ("Schema Definition", "Defines Tweet and Feed types"),
        ("Query Resolver", "Handles fetching tweets/feed"),
        ("Mutation Resolver", "Creates tweets, follows"),
        ("Middleware", "Logging, timing, tracing"),
        ("Authorization", "Check user permissions"),
    ] {
        design.component(&social_graphql, name, description)?;
    }
    add_grpc_layers(
        &mut design,
        &tweet_service,
        ["gRPC entrypoint", "Tweet logic", "Tweet persistence"],
    )?;
    add_grpc_layers(
        &mut design,
        &follow_service,
        ["gRPC entrypoint", "Follow logic", "Follow persistence"],
    )?;

    let moderator = design
        .person("Moderator", "Reviews reported tweets")?
        .tag("staff")
        .finish();
    let tweeter = design
        .person("Tweeter", "Posts and reads tweets")?
        .external()
        .interacts_with(&moderator, "Reports abuse to")
        .finish();
    design
        .container(&social_system, "Web App", "Browser client")?
        .used_by(&tweeter, "Reads timeline with")
        .uses(&social_gateway, "Calls")
        .finish();
    design.uses(&moderator, &social_system, "Moderates content in");

    Ok(design)
}

fn add_grpc_layers(
    design: &mut Design,
    service: &ElementRef<kinds::Container>,
    descriptions: [&str; 3],
) -> DesignResult<()> {
    let [handler, service_logic, repository] = descriptions;
    design.component(service, "Handler", handler)?;
    design.component(service, "Service", service_logic)?;
    design.component(service, "Repository", repository)?;
    Ok(())
}
