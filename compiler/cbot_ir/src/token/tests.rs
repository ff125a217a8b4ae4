use super::*;
use pretty_assertions::assert_eq;

#[test]
fn keyword_lookup_round_trips_spelling() {
    for word in ["if", "while", "extends", "synchronized", "instanceof", "nan"] {
        let Some(kw) = Kw::keyword(word) else {
            panic!("{word} should be a keyword");
        };
        assert_eq!(kw.as_str(), word);
    }
    assert_eq!(Kw::keyword("bool"), Some(Kw::Boolean));
    assert_eq!(Kw::keyword("main"), None);
}

#[test]
fn operators_are_ordered_longest_first() {
    // A shorter operator that is a prefix of a longer one must come later,
    // otherwise maximal munch breaks.
    for (i, (long, _)) in Kw::OPERATORS.iter().enumerate() {
        for (short, _) in &Kw::OPERATORS[..i] {
            assert!(
                !(long.starts_with(short) && long.len() > short.len()),
                "{short} is listed before {long}"
            );
        }
    }
}

#[test]
fn operator_spelling() {
    assert_eq!(Kw::AssSr.as_str(), ">>>=");
    assert_eq!(Kw::Power.as_str(), "**");
    assert_eq!(Kw::Question.to_string(), "?");
}

#[test]
fn assignment_classification() {
    assert!(Kw::Assign.is_assignment());
    assert!(Kw::AssModulo.is_assignment());
    assert!(!Kw::Eq.is_assignment());
    assert!(Kw::String.is_type());
    assert!(!Kw::Class.is_type());
}

#[test]
fn token_list_indexing() {
    let mut list = TokenList::new();
    list.push(Token::keyword(Kw::Int, Span::new(0, 3)));
    list.push(Token::eof(3));
    assert_eq!(list.len(), 2);
    assert!(list[0].is(Kw::Int));
    assert!(list[1].is_eof());
    if let Some(last) = list.last_mut() {
        last.sep.push(' ');
    }
    assert_eq!(list[1].sep, " ");
}
