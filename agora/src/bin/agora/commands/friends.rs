use agora::{FriendWithDetails, RelatedUser, RelationshipAggregator, relationships::FriendRequest};
use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Relationships",
    commands: &[
        "agora friends u-ada                # Friends with mutual-friend counts",
        "agora friends u-ada --requests     # Incoming friend requests",
        "agora friends u-ada --sent         # Requests waiting on someone else",
        "agora friends u-ada --followers    # Who follows u-ada",
    ],
}];

#[derive(Args)]
pub struct FriendsArgs {
    /// User id
    pub user_id: String,

    /// Show pending requests sent to the user
    #[arg(long, conflicts_with_all = ["sent", "followers", "following"])]
    pub requests: bool,

    /// Show pending requests the user sent
    #[arg(long, conflicts_with_all = ["followers", "following"])]
    pub sent: bool,

    /// Show the user's followers
    #[arg(long, conflicts_with = "following")]
    pub followers: bool,

    /// Show who the user follows
    #[arg(long)]
    pub following: bool,
}

#[derive(Serialize)]
#[serde(transparent)]
struct FriendList(Vec<FriendWithDetails>);

#[derive(Serialize)]
#[serde(transparent)]
struct RequestList(Vec<FriendRequest>);

#[derive(Serialize)]
#[serde(transparent)]
struct UserList(Vec<RelatedUser>);

fn since(user: &RelatedUser) -> String {
    user.since.format("%Y-%m-%d").to_string()
}

impl TableDisplay for FriendList {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.table_with_header(&["User", "Name", "Mutual", "Since"]);
        for friend in &self.0 {
            table.add_row(vec![
                Cell::new(&friend.user.user_name),
                Cell::new(&friend.user.display_name),
                Cell::new(friend.mutual_friends_count.to_string()),
                Cell::new(since(&friend.user)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|friend| format!("{}:{}", friend.user.user_id, friend.mutual_friends_count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TableDisplay for RequestList {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.table_with_header(&["Request", "User", "Name", "Sent"]);
        for request in &self.0 {
            table.add_row(vec![
                Cell::new(&request.friendship_id),
                Cell::new(&request.counterpart.user_name),
                Cell::new(&request.counterpart.display_name),
                Cell::new(since(&request.counterpart)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|request| request.counterpart.user_id.clone())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TableDisplay for UserList {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.table_with_header(&["User", "Name", "Since"]);
        for user in &self.0 {
            table.add_row(vec![
                Cell::new(&user.user_name),
                Cell::new(&user.display_name),
                Cell::new(since(user)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|user| user.user_id.clone())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub async fn handle_friends(args: FriendsArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let relationships = RelationshipAggregator::new(&ctx.store);
    let user_id = args.user_id.as_str();

    if args.requests {
        output.heading("Incoming friend requests");
        let requests = relationships.get_friend_requests(user_id).await?;
        output.display(&RequestList(requests))
    } else if args.sent {
        output.heading("Sent friend requests");
        let requests = relationships.get_sent_friend_requests(user_id).await?;
        output.display(&RequestList(requests))
    } else if args.followers {
        output.heading("Followers");
        output.display(&UserList(relationships.get_followers(user_id).await?))
    } else if args.following {
        output.heading("Following");
        output.display(&UserList(relationships.get_following(user_id).await?))
    } else {
        output.heading("Friends");
        let friends = relationships.get_friends(user_id).await?;
        if friends.is_empty() {
            output.info("No friends yet");
        }
        output.display(&FriendList(friends))
    }
}
