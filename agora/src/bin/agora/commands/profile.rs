use agora::{
    ProfileAggregationService, ProfileView, config::Placeholders, errors::ProfileError, models::ImageRole,
};
use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "External Profile",
    commands: &[
        "agora profile ada.l                       # Show ada.l's profile",
        "agora --output json profile ada.l         # Full profile tree as JSON",
        "agora --fixture fixtures/demo.json profile ada.l",
    ],
}];

#[derive(Args)]
pub struct ProfileArgs {
    /// Handle of the user to show
    pub username: String,
}

#[derive(Serialize)]
struct ProfileReport {
    #[serde(flatten)]
    view: ProfileView,
    #[serde(skip)]
    placeholders: Placeholders,
}

impl TableDisplay for ProfileReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let view = &self.view;
        let images = view.images.with_placeholders(&self.placeholders);
        let mut table = output.table_with_header(&["Field", "Value"]);
        let mut row = |field: &str, value: String| {
            table.add_row(vec![Cell::new(field), Cell::new(value)]);
        };

        row("Name", view.user.display_name());
        row("Handle", format!("@{}", view.user.user_name));
        row("Bio", view.user.bio.clone().unwrap_or_default());
        row("Profile image", images[&ImageRole::Profile].clone());
        row("Cover image", images[&ImageRole::CoverProfile].clone());
        row(
            "Posts",
            view.posts
                .iter()
                .map(|post| format!("{} ({} media)", post.post.content, post.media.len()))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        row(
            "Communities",
            view.communities
                .iter()
                .map(|c| {
                    let name = match &c.parent {
                        Some(parent) => format!("{} / {}", parent.name, c.community.name),
                        None => c.community.name.clone(),
                    };
                    format!("{name} ({} members, {} likes)", c.membership_count, c.like_count)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        );
        row(
            "Friends",
            view.friends
                .iter()
                .map(|f| format!("{} ({} mutual)", f.user.display_name, f.mutual_friends_count))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        row("Followers", view.followers.len().to_string());
        row("Following", view.following.len().to_string());
        row(
            "Work",
            view.about
                .work_experience
                .iter()
                .map(|job| format!("{} at {}", job.title, job.company))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        row(
            "Education",
            view.about
                .education
                .iter()
                .map(|school| school.school.clone())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        row("Skills", view.about.skills.join(", "));
        row("Interests", view.about.interests.join(", "));
        table
    }

    fn to_compact(&self) -> String {
        let view = &self.view;
        format!(
            "@{} posts={} communities={} friends={} followers={} following={}",
            view.user.user_name,
            view.posts.len(),
            view.communities.len(),
            view.friends.len(),
            view.followers.len(),
            view.following.len()
        )
    }
}

pub async fn handle_profile(args: ProfileArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let service = ProfileAggregationService::new(&ctx.store, ctx.settings.aggregation.clone());
    output.progress("Aggregating profile");
    let result = service.fetch_user_profile(&args.username).await;
    output.clear_line();

    match result {
        Ok(view) => {
            output.heading(&format!("Profile of @{}", view.user.user_name));
            output.display(&ProfileReport {
                view,
                placeholders: ctx.settings.placeholders.clone(),
            })
        }
        Err(err) => {
            let response = err.to_response();
            if matches!(err, ProfileError::NotFound) {
                output.error(&format!("No user with handle '{}'", args.username));
            } else {
                output.error(&response.error);
            }
            anyhow::bail!("{} ({})", response.error, response.status)
        }
    }
}
