use phf::phf_map;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SpecialForm {
    Define,
    Quote,
    Quasiquote,
    Unquote,
    Begin,
    Lambda,
    Mu,
    If,
    And,
    Or,
    Cond,
    Let,
}

pub static SPECIAL_FORMS: phf::Map<&'static str, SpecialForm> = phf_map! {
    "define" => SpecialForm::Define,
    "quote" => SpecialForm::Quote,
    "quasiquote" => SpecialForm::Quasiquote,
    "unquote" => SpecialForm::Unquote,
    "begin" => SpecialForm::Begin,
    "lambda" => SpecialForm::Lambda,
    "λ" => SpecialForm::Lambda,
    "mu" => SpecialForm::Mu,
    "if" => SpecialForm::If,
    "and" => SpecialForm::And,
    "or" => SpecialForm::Or,
    "cond" => SpecialForm::Cond,
    "let" => SpecialForm::Let,
};
