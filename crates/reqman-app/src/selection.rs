// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Cascading department → team → assignee selection.
//!
//! Each step is a pure function of the option lists and the previous
//! selection. [`SelectionChain`] strings them together and always recomputes
//! downstream of the level that changed, never upstream.

use crate::{Assignee, Department, DepartmentId, RequestType, RequestTypeId, Team, TeamId, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption<T> {
    pub value: T,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices<T> {
    pub options: Vec<SelectOption<T>>,
    pub selected: Option<T>,
}

impl<T> Default for Choices<T> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            selected: None,
        }
    }
}

impl<T: Copy + PartialEq> Choices<T> {
    pub fn contains(&self, value: T) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    pub fn values(&self) -> Vec<T> {
        self.options.iter().map(|option| option.value).collect()
    }

    fn keep_if_present(options: Vec<SelectOption<T>>, previous: Option<T>) -> Self {
        let selected =
            previous.filter(|value| options.iter().any(|option| option.value == *value));
        Self { options, selected }
    }
}

pub fn department_choices(
    departments: &[Department],
    previous: Option<DepartmentId>,
) -> Choices<DepartmentId> {
    let options = departments
        .iter()
        .map(|department| SelectOption {
            value: department.id,
            label: department.name.clone(),
        })
        .collect();
    Choices::keep_if_present(options, previous)
}

/// Teams belonging to `department`, in the order of `teams`. The previous
/// team stays selected only when it is still one of them.
pub fn team_choices(
    departments: &[Department],
    teams: &[Team],
    department: Option<DepartmentId>,
    previous: Option<TeamId>,
) -> Choices<TeamId> {
    let Some(department) = department
        .and_then(|id| departments.iter().find(|department| department.id == id))
    else {
        return Choices::default();
    };

    let options = teams
        .iter()
        .filter(|team| department.has_team(team.id))
        .map(|team| SelectOption {
            value: team.id,
            label: team.name.clone(),
        })
        .collect();
    Choices::keep_if_present(options, previous)
}

/// Members of `team` plus exactly one leading "unassigned" option. The
/// selection is never empty: it falls back to [`Assignee::Unassigned`].
pub fn assignee_choices(
    team: Option<TeamId>,
    users: &[User],
    previous: Assignee,
) -> Choices<Assignee> {
    let mut options = vec![SelectOption {
        value: Assignee::Unassigned,
        label: Assignee::UNASSIGNED_LABEL.to_owned(),
    }];
    if let Some(team) = team {
        options.extend(
            users
                .iter()
                .filter(|user| user.is_member_of(team))
                .map(|user| SelectOption {
                    value: Assignee::User(user.id),
                    label: user.display_name(),
                }),
        );
    }

    let selected = match previous {
        Assignee::User(_) if options.iter().any(|option| option.value == previous) => previous,
        _ => Assignee::Unassigned,
    };
    Choices {
        options,
        selected: Some(selected),
    }
}

pub fn type_choices(
    request_types: &[RequestType],
    previous: Option<RequestTypeId>,
) -> Choices<RequestTypeId> {
    let options = request_types
        .iter()
        .map(|request_type| SelectOption {
            value: request_type.id,
            label: request_type.name.clone(),
        })
        .collect();
    Choices::keep_if_present(options, previous)
}

/// What a selection step recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionChange {
    pub teams: bool,
    pub assignees: bool,
    /// Set when the team selection moved to a team whose members are not
    /// loaded yet.
    pub members_needed: Option<TeamId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionChain {
    department: Choices<DepartmentId>,
    team: Choices<TeamId>,
    assignee: Choices<Assignee>,
    /// Assignee to re-select once the new team's members arrive.
    carried: Option<Assignee>,
}

impl SelectionChain {
    /// Seeds the chain from a request's stored selection, strictly in
    /// department → team → assignee order.
    pub fn seed(
        departments: &[Department],
        teams: &[Team],
        members: &[User],
        department: Option<DepartmentId>,
        team: Option<TeamId>,
        assignee: Assignee,
    ) -> Self {
        let department = department_choices(departments, department);
        let team = team_choices(departments, teams, department.selected, team);
        let assignee = assignee_choices(team.selected, members, assignee);
        Self {
            department,
            team,
            assignee,
            carried: None,
        }
    }

    pub fn department(&self) -> &Choices<DepartmentId> {
        &self.department
    }

    pub fn team(&self) -> &Choices<TeamId> {
        &self.team
    }

    pub fn assignee(&self) -> &Choices<Assignee> {
        &self.assignee
    }

    pub fn selected_assignee(&self) -> Assignee {
        self.assignee.selected.unwrap_or_default()
    }

    pub fn select_department(
        &mut self,
        departments: &[Department],
        teams: &[Team],
        department: Option<DepartmentId>,
    ) -> SelectionChange {
        self.department = department_choices(departments, department);
        let previous_team = self.team.selected;
        self.team = team_choices(departments, teams, self.department.selected, previous_team);
        let mut change = SelectionChange {
            teams: true,
            ..SelectionChange::default()
        };
        if self.team.selected != previous_team {
            change.assignees = true;
            change.members_needed = self.reset_assignees();
        }
        change
    }

    /// Moves the team selection. `None` or a team outside the current
    /// department's list clears it.
    pub fn select_team(&mut self, team: Option<TeamId>) -> SelectionChange {
        let next = team.filter(|team| self.team.contains(*team));
        if next == self.team.selected {
            return SelectionChange::default();
        }
        self.team.selected = next;
        SelectionChange {
            teams: true,
            assignees: true,
            members_needed: self.reset_assignees(),
        }
    }

    /// Applies a freshly fetched member list. Returns false when the list
    /// belongs to a team that is no longer selected.
    pub fn apply_members(&mut self, team: TeamId, members: &[User]) -> bool {
        if self.team.selected != Some(team) {
            return false;
        }
        let previous = self
            .carried
            .take()
            .unwrap_or_else(|| self.selected_assignee());
        self.assignee = assignee_choices(Some(team), members, previous);
        true
    }

    pub fn select_assignee(&mut self, assignee: Assignee) -> bool {
        if !self.assignee.contains(assignee) {
            return false;
        }
        self.assignee.selected = Some(assignee);
        self.carried = None;
        true
    }

    fn reset_assignees(&mut self) -> Option<TeamId> {
        let previous = self.selected_assignee();
        self.assignee = assignee_choices(None, &[], Assignee::Unassigned);
        self.carried = self.team.selected.map(|_| previous);
        self.team.selected
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectionChain, assignee_choices, department_choices, team_choices};
    use crate::{Assignee, Department, DepartmentId, Team, TeamId, User, UserId};
    use std::collections::BTreeSet;

    fn department(id: i64, teams: &[i64]) -> Department {
        Department {
            id: DepartmentId::new(id),
            name: format!("Department {id}"),
            description: String::new(),
            member_team_ids: teams.iter().copied().map(TeamId::new).collect(),
            initial_team_id: teams.first().copied().map(TeamId::new),
        }
    }

    fn team(id: i64) -> Team {
        Team {
            id: TeamId::new(id),
            name: format!("Team {id}"),
            description: String::new(),
            department_id: None,
        }
    }

    fn user(id: i64, teams: &[i64]) -> User {
        User {
            id: UserId::new(id),
            first_name: format!("User{id}"),
            last_name: "Tester".to_owned(),
            username: format!("user{id}"),
            team_ids: teams.iter().copied().map(TeamId::new).collect::<BTreeSet<_>>(),
        }
    }

    fn org() -> (Vec<Department>, Vec<Team>) {
        (
            vec![department(1, &[1, 2]), department(2, &[5, 6])],
            vec![team(1), team(2), team(5), team(6), team(9)],
        )
    }

    #[test]
    fn team_filter_follows_department_membership() {
        let (departments, teams) = org();
        let choices = team_choices(&departments, &teams, Some(DepartmentId::new(2)), None);
        assert_eq!(choices.values(), vec![TeamId::new(5), TeamId::new(6)]);
        assert_eq!(choices.selected, None);

        for department in &departments {
            let choices = team_choices(&departments, &teams, Some(department.id), None);
            for team in &teams {
                assert_eq!(choices.contains(team.id), department.has_team(team.id));
            }
        }
    }

    #[test]
    fn team_filter_is_empty_without_a_known_department() {
        let (departments, teams) = org();
        assert!(team_choices(&departments, &teams, None, Some(TeamId::new(5)))
            .options
            .is_empty());
        let unknown = team_choices(&departments, &teams, Some(DepartmentId::new(42)), None);
        assert!(unknown.options.is_empty());
        assert_eq!(unknown.selected, None);
    }

    #[test]
    fn previous_team_kept_only_when_still_valid() {
        let (departments, teams) = org();
        let kept = team_choices(
            &departments,
            &teams,
            Some(DepartmentId::new(2)),
            Some(TeamId::new(6)),
        );
        assert_eq!(kept.selected, Some(TeamId::new(6)));

        let dropped = team_choices(
            &departments,
            &teams,
            Some(DepartmentId::new(1)),
            Some(TeamId::new(6)),
        );
        assert_eq!(dropped.selected, None);
    }

    #[test]
    fn assignee_options_are_members_plus_one_unassigned() {
        let users = vec![user(1, &[5]), user(2, &[6]), user(3, &[5, 6])];
        let choices = assignee_choices(Some(TeamId::new(5)), &users, Assignee::Unassigned);
        assert_eq!(
            choices.values(),
            vec![
                Assignee::Unassigned,
                Assignee::User(UserId::new(1)),
                Assignee::User(UserId::new(3)),
            ]
        );
        let unassigned = choices
            .options
            .iter()
            .filter(|option| option.value == Assignee::Unassigned)
            .count();
        assert_eq!(unassigned, 1);
        assert_eq!(choices.selected, Some(Assignee::Unassigned));
    }

    #[test]
    fn assignee_outside_team_falls_back_to_unassigned() {
        let users = vec![user(1, &[5]), user(2, &[6])];
        let kept = assignee_choices(
            Some(TeamId::new(5)),
            &users,
            Assignee::User(UserId::new(1)),
        );
        assert_eq!(kept.selected, Some(Assignee::User(UserId::new(1))));

        let dropped = assignee_choices(
            Some(TeamId::new(5)),
            &users,
            Assignee::User(UserId::new(2)),
        );
        assert_eq!(dropped.selected, Some(Assignee::Unassigned));
    }

    #[test]
    fn seeded_chain_matches_stored_request_selection() {
        let (departments, teams) = org();
        let chain = SelectionChain::seed(
            &departments,
            &teams,
            &[],
            Some(DepartmentId::new(2)),
            Some(TeamId::new(5)),
            Assignee::from_legacy_id(Some(-1)),
        );
        assert_eq!(chain.department().selected, Some(DepartmentId::new(2)));
        assert_eq!(chain.team().values(), vec![TeamId::new(5), TeamId::new(6)]);
        assert_eq!(chain.team().selected, Some(TeamId::new(5)));
        assert_eq!(chain.assignee().values(), vec![Assignee::Unassigned]);
        assert_eq!(chain.selected_assignee(), Assignee::Unassigned);
    }

    #[test]
    fn department_change_never_leaves_an_invalid_team_selected() {
        let (departments, teams) = org();
        let members = vec![user(1, &[5])];
        let mut chain = SelectionChain::seed(
            &departments,
            &teams,
            &members,
            Some(DepartmentId::new(2)),
            Some(TeamId::new(5)),
            Assignee::User(UserId::new(1)),
        );
        assert_eq!(chain.selected_assignee(), Assignee::User(UserId::new(1)));

        let change =
            chain.select_department(&departments, &teams, Some(DepartmentId::new(2)));
        assert!(change.teams);
        assert!(!change.assignees);
        assert_eq!(chain.team().selected, Some(TeamId::new(5)));
        assert_eq!(chain.selected_assignee(), Assignee::User(UserId::new(1)));

        let change =
            chain.select_department(&departments, &teams, Some(DepartmentId::new(1)));
        assert!(change.teams);
        assert!(change.assignees);
        assert_eq!(change.members_needed, None);
        assert_eq!(chain.team().selected, None);
        assert_eq!(chain.team().values(), vec![TeamId::new(1), TeamId::new(2)]);
        assert_eq!(chain.assignee().values(), vec![Assignee::Unassigned]);
        assert_eq!(chain.selected_assignee(), Assignee::Unassigned);
    }

    #[test]
    fn team_change_requests_members_and_ignores_late_lists() {
        let (departments, teams) = org();
        let mut chain = SelectionChain::seed(
            &departments,
            &teams,
            &[],
            Some(DepartmentId::new(2)),
            Some(TeamId::new(5)),
            Assignee::Unassigned,
        );

        let change = chain.select_team(Some(TeamId::new(6)));
        assert_eq!(change.members_needed, Some(TeamId::new(6)));
        assert_eq!(chain.assignee().values(), vec![Assignee::Unassigned]);

        assert!(!chain.apply_members(TeamId::new(5), &[user(1, &[5])]));
        assert!(chain.apply_members(TeamId::new(6), &[user(2, &[6])]));
        assert_eq!(
            chain.assignee().values(),
            vec![Assignee::Unassigned, Assignee::User(UserId::new(2))]
        );
        assert!(chain.select_assignee(Assignee::User(UserId::new(2))));
        assert!(!chain.select_assignee(Assignee::User(UserId::new(1))));
    }

    #[test]
    fn selecting_a_team_outside_the_department_clears_it() {
        let (departments, teams) = org();
        let mut chain = SelectionChain::seed(
            &departments,
            &teams,
            &[],
            Some(DepartmentId::new(2)),
            Some(TeamId::new(5)),
            Assignee::Unassigned,
        );
        let change = chain.select_team(Some(TeamId::new(9)));
        assert!(change.assignees);
        assert_eq!(change.members_needed, None);
        assert_eq!(chain.team().selected, None);

        let unchanged = chain.select_team(None);
        assert!(!unchanged.teams);
    }

    #[test]
    fn unknown_department_selection_is_dropped() {
        let (departments, _) = org();
        let choices = department_choices(&departments, Some(DepartmentId::new(99)));
        assert_eq!(choices.selected, None);
        assert_eq!(choices.options.len(), 2);
    }
}
