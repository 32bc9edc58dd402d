use crate::commands::{catalog, friends, profile, seed};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "profile",
            groups: profile::EXAMPLES,
        },
        CommandExample {
            name: "catalog",
            groups: catalog::CATALOG_EXAMPLES,
        },
        CommandExample {
            name: "listing",
            groups: catalog::LISTING_EXAMPLES,
        },
        CommandExample {
            name: "friends",
            groups: friends::EXAMPLES,
        },
        CommandExample {
            name: "seed",
            groups: seed::EXAMPLES,
        },
    ]
}
